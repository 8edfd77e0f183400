//! Network topology and leak prediction model.

mod graph;
mod types;

pub use graph::NetworkGraph;
pub use types::{
	LeakPrediction, NetworkSnapshot, Node, NodeType, ObservationNodes, Pipe, Position,
	PredictionsPayload, RiskLevel,
};

use std::collections::BTreeSet;

use petgraph::graph::NodeIndex;

use crate::geo::{self, GeoPoint, LeakZone};
use crate::network::{LeakPrediction, NetworkGraph};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 10.0;
pub const WHEEL_ZOOM_IN: f64 = 1.1;
pub const WHEEL_ZOOM_OUT: f64 = 0.9;
pub const BUTTON_ZOOM: f64 = 1.2;

/// Pan/zoom applied on top of the fitted layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	pub fn clamp_scale(k: f64) -> f64 {
		k.clamp(MIN_SCALE, MAX_SCALE)
	}
}

/// Pointer state machine of the map.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Interaction {
	#[default]
	Idle,
	Dragging {
		last_x: f64,
		last_y: f64,
	},
	Hovering(NodeIndex),
}

/// Everything the map needs to draw a prediction on top of the network.
#[derive(Clone, Debug, PartialEq)]
pub struct LeakOverlay {
	pub center: GeoPoint,
	pub size_lps: f64,
	pub zone: LeakZone,
	/// Id of the node the prediction snapped to.
	pub snapped: Option<String>,
	pub snapped_distance_m: Option<f64>,
	pub affected_pipes: BTreeSet<String>,
}

impl LeakOverlay {
	/// Snaps the prediction to its nearest node and derives the zone and the
	/// widened affected-pipe set. `None` when the prediction has no location.
	pub fn from_prediction(graph: &NetworkGraph, prediction: &LeakPrediction) -> Option<Self> {
		let center = prediction.location()?;
		let nearest = graph.nearest(center.lat, center.lng);
		let affected_pipes = graph.affected_pipes(prediction, nearest.map(|n| n.node));
		let bounds = (!graph.is_empty()).then(|| graph.bounds());
		let size_lps = prediction.size();

		Some(Self {
			center,
			size_lps,
			zone: geo::leak_zone(center, size_lps, bounds.as_ref()),
			snapped: nearest.map(|n| n.node.id.clone()),
			snapped_distance_m: nearest.map(|n| n.distance_m),
			affected_pipes,
		})
	}

	/// Display location: the snapped node if there is one.
	pub fn snapped_location(&self, graph: &NetworkGraph) -> GeoPoint {
		self.snapped
			.as_deref()
			.and_then(|id| graph.node(id))
			.and_then(|n| n.gps())
			.unwrap_or(self.center)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::geo::to_gps;
	use crate::network::{NetworkSnapshot, Node, NodeType, Pipe, Position};

	fn graph() -> NetworkGraph {
		let node = |id: &str, x: f64| Node {
			id: id.into(),
			node_type: NodeType::Junction,
			coordinates: Some(Position::Normalized { x, y: 500.0 }),
			elevation: None,
			risk: None,
		};
		let pipe = |id: &str, from: &str, to: &str| Pipe {
			id: id.into(),
			from_node: from.into(),
			to_node: to.into(),
			length: None,
			diameter: None,
			status: None,
		};
		NetworkGraph::from_snapshot(&NetworkSnapshot {
			nodes: vec![node("A", 100.0), node("B", 500.0), node("C", 900.0)],
			pipes: vec![pipe("P1", "A", "B"), pipe("P2", "B", "C")],
			..Default::default()
		})
	}

	#[test]
	fn test_overlay_snaps_and_widens() {
		let graph = graph();
		let prediction = LeakPrediction {
			leak_x: Some(520.0),
			leak_y: Some(510.0),
			leak_size_lps: 10.0,
			..Default::default()
		};
		let overlay = LeakOverlay::from_prediction(&graph, &prediction).expect("has location");

		assert_eq!(overlay.snapped.as_deref(), Some("B"));
		assert!(overlay.affected_pipes.contains("P1") && overlay.affected_pipes.contains("P2"));
		assert_eq!(overlay.snapped_location(&graph), to_gps(500.0, 500.0));
		assert_eq!(overlay.zone.center, to_gps(520.0, 510.0));
	}

	#[test]
	fn test_overlay_without_location() {
		assert!(LeakOverlay::from_prediction(&graph(), &LeakPrediction::default()).is_none());
	}

	#[test]
	fn test_overlay_on_empty_network_keeps_raw_center() {
		let empty = NetworkGraph::default();
		let prediction = LeakPrediction {
			leak_lat: Some(27.72),
			leak_lng: Some(85.33),
			..Default::default()
		};
		let overlay = LeakOverlay::from_prediction(&empty, &prediction).expect("has location");
		assert_eq!(overlay.snapped, None);
		assert_eq!(overlay.snapped_location(&empty), GeoPoint { lat: 27.72, lng: 85.33 });
		assert_eq!((overlay.zone.radius_x_m, overlay.zone.radius_y_m), (120.0, 80.0));
	}
}

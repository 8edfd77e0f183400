use std::collections::{BTreeSet, HashMap};

use log::debug;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use super::types::{LeakPrediction, NetworkSnapshot, Node, Pipe, RiskLevel};
use crate::geo::{self, GeoBounds, NearestNode};
use crate::simulation::Intensity;

/// Renderable network: nodes with coordinates and the pipes whose endpoints
/// both resolved. Built once per snapshot and replaced on refresh.
#[derive(Clone, Debug, Default)]
pub struct NetworkGraph {
	graph: UnGraph<Node, Pipe>,
	index: HashMap<String, NodeIndex>,
	dropped_nodes: usize,
	dropped_pipes: usize,
	pub total_nodes: usize,
	pub total_pipes: usize,
	pub system_status: String,
	pub timestamp: String,
}

impl NetworkGraph {
	pub fn from_snapshot(snapshot: &NetworkSnapshot) -> Self {
		let mut graph = UnGraph::with_capacity(snapshot.nodes.len(), snapshot.pipes.len());
		let mut index = HashMap::with_capacity(snapshot.nodes.len());
		let mut dropped_nodes = 0;

		for node in &snapshot.nodes {
			if node.position().is_none() || index.contains_key(&node.id) {
				dropped_nodes += 1;
				continue;
			}
			let idx = graph.add_node(node.clone());
			index.insert(node.id.clone(), idx);
		}

		let mut dropped_pipes = 0;
		for pipe in &snapshot.pipes {
			match (index.get(&pipe.from_node), index.get(&pipe.to_node)) {
				(Some(&from), Some(&to)) => {
					graph.add_edge(from, to, pipe.clone());
				}
				_ => dropped_pipes += 1,
			}
		}

		if dropped_nodes > 0 || dropped_pipes > 0 {
			debug!(
				"Snapshot {}: skipped {} nodes and {} pipes with missing data",
				snapshot.timestamp, dropped_nodes, dropped_pipes
			);
		}

		Self {
			graph,
			index,
			dropped_nodes,
			dropped_pipes,
			total_nodes: snapshot.total_nodes.max(snapshot.nodes.len()),
			total_pipes: snapshot.total_pipes.max(snapshot.pipes.len()),
			system_status: snapshot.system_status.clone(),
			timestamp: snapshot.timestamp.clone(),
		}
	}

	pub fn node_count(&self) -> usize {
		self.graph.node_count()
	}

	/// Number of renderable pipes.
	pub fn pipe_count(&self) -> usize {
		self.graph.edge_count()
	}

	pub fn dropped_nodes(&self) -> usize {
		self.dropped_nodes
	}

	pub fn dropped_pipes(&self) -> usize {
		self.dropped_pipes
	}

	pub fn is_empty(&self) -> bool {
		self.graph.node_count() == 0
	}

	pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
		self.index.get(id).copied()
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.node_index(id).map(|idx| &self.graph[idx])
	}

	pub fn node_at(&self, idx: NodeIndex) -> &Node {
		&self.graph[idx]
	}

	/// Nodes in snapshot order.
	pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
		self.graph.node_indices().map(|idx| (idx, &self.graph[idx]))
	}

	/// Pipes with their resolved endpoints, in snapshot order.
	pub fn pipes(&self) -> impl Iterator<Item = (&Pipe, NodeIndex, NodeIndex)> {
		self.graph
			.edge_references()
			.map(|e| (e.weight(), e.source(), e.target()))
	}

	pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> {
		self.graph.neighbors(idx)
	}

	/// Ids of pipes touching the given node.
	pub fn incident_pipes(&self, id: &str) -> Vec<&str> {
		let Some(idx) = self.node_index(id) else {
			return Vec::new();
		};
		self.graph
			.edges(idx)
			.map(|e| e.weight().id.as_str())
			.collect()
	}

	pub fn bounds(&self) -> GeoBounds {
		geo::bounds_of(self.graph.node_weights())
	}

	pub fn nearest(&self, lat: f64, lng: f64) -> Option<NearestNode<'_>> {
		geo::nearest_node(self.graph.node_weights(), lat, lng)
	}

	/// Declared affected pipes widened with every pipe incident to the node the
	/// prediction snapped to.
	pub fn affected_pipes(
		&self,
		prediction: &LeakPrediction,
		nearest: Option<&Node>,
	) -> BTreeSet<String> {
		let mut affected = prediction.affected_pipes.clone();
		if let Some(node) = nearest {
			affected.extend(self.incident_pipes(&node.id).into_iter().map(String::from));
		}
		affected
	}

	/// Risk per node from a batch of predictions: each prediction marks the node
	/// it snaps to with its intensity's level, keeping the highest per node.
	pub fn risk_from_predictions(&self, predictions: &[LeakPrediction]) -> HashMap<String, RiskLevel> {
		let mut levels: HashMap<String, RiskLevel> = HashMap::new();
		for prediction in predictions {
			let Some(at) = prediction.location() else { continue };
			let Some(nearest) = self.nearest(at.lat, at.lng) else { continue };
			let level = Intensity::from_size(prediction.size()).risk();
			levels
				.entry(nearest.node.id.clone())
				.and_modify(|l| *l = (*l).max(level))
				.or_insert(level);
		}
		levels
	}

}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::network::{NodeType, Position};

	fn node(id: &str, x: f64, y: f64) -> Node {
		Node {
			id: id.into(),
			node_type: NodeType::Junction,
			coordinates: Some(Position::Normalized { x, y }),
			elevation: Some(1300.0),
			risk: None,
		}
	}

	fn pipe(id: &str, from: &str, to: &str) -> Pipe {
		Pipe {
			id: id.into(),
			from_node: from.into(),
			to_node: to.into(),
			length: None,
			diameter: None,
			status: None,
		}
	}

	fn line_snapshot() -> NetworkSnapshot {
		NetworkSnapshot {
			nodes: vec![node("A", 400.0, 500.0), node("B", 500.0, 500.0), node("C", 600.0, 500.0)],
			pipes: vec![pipe("P1", "A", "B"), pipe("P2", "B", "C")],
			total_nodes: 3,
			total_pipes: 2,
			system_status: "operational".into(),
			timestamp: "2024-01-01T00:00:00".into(),
		}
	}

	#[test]
	fn test_dangling_pipes_are_dropped() {
		let mut snapshot = line_snapshot();
		snapshot.pipes.push(pipe("P3", "C", "missing"));
		snapshot.pipes.push(pipe("P4", "ghost", "A"));
		snapshot.total_pipes = 4;

		let graph = NetworkGraph::from_snapshot(&snapshot);
		assert_eq!(graph.pipe_count(), 2);
		assert_eq!(graph.dropped_pipes(), 2);
		assert_eq!(graph.pipe_count(), graph.total_pipes - graph.dropped_pipes());
	}

	#[test]
	fn test_nodes_without_coordinates_are_filtered() {
		let mut snapshot = line_snapshot();
		snapshot.nodes[2].coordinates = None;

		let graph = NetworkGraph::from_snapshot(&snapshot);
		assert_eq!(graph.node_count(), 2);
		assert_eq!(graph.dropped_nodes(), 1);
		// P2 pointed at C
		assert_eq!(graph.pipe_count(), 1);
	}

	#[test]
	fn test_duplicate_node_ids_keep_first() {
		let mut snapshot = line_snapshot();
		snapshot.nodes.push(node("A", 0.0, 0.0));

		let graph = NetworkGraph::from_snapshot(&snapshot);
		assert_eq!(graph.node_count(), 3);
		assert_eq!(graph.node("A").and_then(Node::normalized), Some((400.0, 500.0)));
	}

	#[test]
	fn test_adjacency() {
		let graph = NetworkGraph::from_snapshot(&line_snapshot());
		let b = graph.node_index("B").expect("B should exist");
		let mut neighbors: Vec<&str> = graph
			.neighbors(b)
			.map(|idx| graph.node_at(idx).id.as_str())
			.collect();
		neighbors.sort_unstable();
		assert_eq!(neighbors, vec!["A", "C"]);

		let mut incident = graph.incident_pipes("B");
		incident.sort_unstable();
		assert_eq!(incident, vec!["P1", "P2"]);
		assert!(graph.incident_pipes("nope").is_empty());
	}

	#[test]
	fn test_affected_pipes_widened_by_nearest() {
		let graph = NetworkGraph::from_snapshot(&line_snapshot());
		let prediction = LeakPrediction {
			affected_pipes: BTreeSet::from(["P9".to_string()]),
			..Default::default()
		};

		let without = graph.affected_pipes(&prediction, None);
		assert_eq!(without, BTreeSet::from(["P9".to_string()]));

		let a = graph.node("A");
		let with = graph.affected_pipes(&prediction, a);
		assert_eq!(with, BTreeSet::from(["P1".to_string(), "P9".to_string()]));
	}

	#[test]
	fn test_three_node_line_scenario() {
		let graph = NetworkGraph::from_snapshot(&line_snapshot());
		let prediction = LeakPrediction {
			leak_x: Some(500.0),
			leak_y: Some(500.0),
			leak_size_lps: 10.0,
			..Default::default()
		};
		let location = prediction.location().expect("prediction has coordinates");

		let nearest = graph.nearest(location.lat, location.lng).expect("should snap");
		assert_eq!(nearest.node.id, "B");

		let affected = graph.affected_pipes(&prediction, Some(nearest.node));
		assert_eq!(affected, BTreeSet::from(["P1".to_string(), "P2".to_string()]));

		let bounds = graph.bounds();
		let zone = geo::leak_zone(location, prediction.size(), Some(&bounds));
		// the line has no north-south extent, so the box never constrains it
		let expected = 80.0 * (1.0f64 + 10.0 / 30.0).min(3.0) * 1.5;
		assert!((zone.radius_x_m - expected).abs() < 1e-9);
	}

	#[test]
	fn test_empty_snapshot() {
		let graph = NetworkGraph::from_snapshot(&NetworkSnapshot::default());
		assert!(graph.is_empty());
		assert!(graph.nearest(27.7, 85.3).is_none());
		assert_eq!(graph.bounds(), geo::bounds_of(&[] as &[Node]));
	}

	#[test]
	fn test_risk_from_predictions_keeps_highest() {
		let graph = NetworkGraph::from_snapshot(&NetworkSnapshot {
			nodes: vec![node("A", 100.0, 100.0), node("B", 900.0, 900.0)],
			..Default::default()
		});
		let at = |x: f64, size: f64| LeakPrediction {
			leak_x: Some(x),
			leak_y: Some(x),
			leak_size_lps: size,
			..Default::default()
		};
		let levels = graph.risk_from_predictions(&[
			at(110.0, 2.0),
			at(120.0, 40.0),
			at(880.0, 8.0),
			LeakPrediction::default(),
		]);
		assert_eq!(levels.len(), 2);
		assert_eq!(levels["A"], RiskLevel::High);
		assert_eq!(levels["B"], RiskLevel::Medium);
		assert!(NetworkGraph::default().risk_from_predictions(&[at(1.0, 1.0)]).is_empty());
	}
}

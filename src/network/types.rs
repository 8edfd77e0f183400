use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::{GeoPoint, to_gps};

/// Kind of network element a node represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
	Tank,
	Reservoir,
	#[default]
	#[serde(other)]
	Junction,
}

impl NodeType {
	pub fn label(self) -> &'static str {
		match self {
			NodeType::Junction => "Junction",
			NodeType::Tank => "Tank",
			NodeType::Reservoir => "Reservoir",
		}
	}
}

/// Discrete leak risk attached to a node for visual coding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
	#[default]
	None,
	Low,
	Medium,
	High,
}

impl RiskLevel {
	pub fn label(self) -> &'static str {
		match self {
			RiskLevel::None => "none",
			RiskLevel::Low => "low",
			RiskLevel::Medium => "medium",
			RiskLevel::High => "high",
		}
	}
}

/// Node position as sent by the backend: either simulation space or GPS.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
	Gps { lat: f64, lng: f64 },
	Normalized { x: f64, y: f64 },
}

impl Position {
	pub fn gps(&self) -> GeoPoint {
		match *self {
			Position::Gps { lat, lng } => GeoPoint { lat, lng },
			Position::Normalized { x, y } => to_gps(x, y),
		}
	}

	/// Simulation-space coordinates, converting GPS positions back if needed.
	pub fn normalized(&self) -> (f64, f64) {
		match *self {
			Position::Gps { lat, lng } => crate::geo::from_gps(lat, lng),
			Position::Normalized { x, y } => (x, y),
		}
	}

	fn is_finite(&self) -> bool {
		match *self {
			Position::Gps { lat, lng } => lat.is_finite() && lng.is_finite(),
			Position::Normalized { x, y } => x.is_finite() && y.is_finite(),
		}
	}
}

/// Reads an optional field, treating a value of the wrong shape as absent so
/// one malformed node cannot fail a whole snapshot.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	let value = Option::<serde_json::Value>::deserialize(deserializer)?;
	Ok(value.and_then(|v| T::deserialize(v).ok()))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	pub id: String,
	#[serde(rename = "type", default)]
	pub node_type: NodeType,
	#[serde(default, deserialize_with = "lenient")]
	pub coordinates: Option<Position>,
	#[serde(default)]
	pub elevation: Option<f64>,
	#[serde(
		default,
		alias = "risk_level",
		deserialize_with = "lenient",
		skip_serializing_if = "Option::is_none"
	)]
	pub risk: Option<RiskLevel>,
}

impl Node {
	/// Coordinates, if present and finite.
	pub fn position(&self) -> Option<Position> {
		self.coordinates.filter(Position::is_finite)
	}

	pub fn gps(&self) -> Option<GeoPoint> {
		self.position().map(|p| p.gps())
	}

	pub fn normalized(&self) -> Option<(f64, f64)> {
		self.position().map(|p| p.normalized())
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
	pub id: String,
	pub from_node: String,
	pub to_node: String,
	#[serde(default)]
	pub length: Option<f64>,
	#[serde(default)]
	pub diameter: Option<f64>,
	#[serde(default)]
	pub status: Option<String>,
}

/// Full topology as returned by `GET /network`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
	#[serde(default)]
	pub nodes: Vec<Node>,
	#[serde(default)]
	pub pipes: Vec<Pipe>,
	#[serde(default)]
	pub total_nodes: usize,
	#[serde(default)]
	pub total_pipes: usize,
	#[serde(default)]
	pub system_status: String,
	#[serde(default)]
	pub timestamp: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationNodes {
	#[serde(default)]
	pub observation_nodes: Vec<Node>,
}

/// A single predicted leak. The GPS position and snapped node are derived on
/// demand and never stored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LeakPrediction {
	#[serde(default)]
	pub node_id: Option<String>,
	#[serde(default)]
	pub leak_x: Option<f64>,
	#[serde(default)]
	pub leak_y: Option<f64>,
	#[serde(default)]
	pub leak_lat: Option<f64>,
	#[serde(default)]
	pub leak_lng: Option<f64>,
	#[serde(default)]
	pub leak_size_lps: f64,
	#[serde(default)]
	pub affected_pipes: BTreeSet<String>,
}

impl LeakPrediction {
	/// GPS location, preferring explicit lat/lng over normalized coordinates.
	pub fn location(&self) -> Option<GeoPoint> {
		match (self.leak_lat, self.leak_lng, self.leak_x, self.leak_y) {
			(Some(lat), Some(lng), _, _) if lat.is_finite() && lng.is_finite() => {
				Some(GeoPoint { lat, lng })
			}
			(_, _, Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(to_gps(x, y)),
			_ => None,
		}
	}

	/// Leak size, with negative or missing values read as zero.
	pub fn size(&self) -> f64 {
		if self.leak_size_lps.is_finite() {
			self.leak_size_lps.max(0.0)
		} else {
			0.0
		}
	}
}

/// `GET /leak-predictions` comes either as parallel arrays or a single object.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PredictionsPayload {
	Series {
		leak_x: Vec<f64>,
		leak_y: Vec<f64>,
		leak_size_lps: Vec<f64>,
		#[serde(default)]
		node_id: Option<String>,
	},
	Single(LeakPrediction),
}

impl PredictionsPayload {
	/// Flattens either shape into one prediction per leak. Arrays of unequal
	/// length are cut to the shortest.
	pub fn into_predictions(self) -> Vec<LeakPrediction> {
		match self {
			PredictionsPayload::Series {
				leak_x,
				leak_y,
				leak_size_lps,
				node_id,
			} => leak_x
				.into_iter()
				.zip(leak_y)
				.zip(leak_size_lps)
				.map(|((x, y), size)| LeakPrediction {
					node_id: node_id.clone(),
					leak_x: Some(x),
					leak_y: Some(y),
					leak_size_lps: size,
					..Default::default()
				})
				.collect(),
			PredictionsPayload::Single(prediction) => vec![prediction],
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_node_accepts_both_coordinate_shapes() {
		let json = r#"[
			{"id": "J1", "type": "junction", "coordinates": {"x": 100.0, "y": 200.0}, "elevation": 12.5},
			{"id": "R1", "type": "reservoir", "coordinates": {"lat": 27.71, "lng": 85.32}}
		]"#;
		let nodes: Vec<Node> = serde_json::from_str(json).expect("nodes should parse");

		assert_eq!(nodes[0].coordinates, Some(Position::Normalized { x: 100.0, y: 200.0 }));
		assert_eq!(nodes[0].elevation, Some(12.5));
		assert_eq!(nodes[1].node_type, NodeType::Reservoir);
		assert_eq!(nodes[1].gps(), Some(GeoPoint { lat: 27.71, lng: 85.32 }));
	}

	#[test]
	fn test_unknown_node_type_reads_as_junction() {
		let node: Node = serde_json::from_str(r#"{"id": "V1", "type": "valve"}"#)
			.expect("node should parse");
		assert_eq!(node.node_type, NodeType::Junction);
		assert_eq!(node.position(), None);
	}

	#[test]
	fn test_malformed_node_fields_do_not_fail_snapshot() {
		let json = r#"{
			"nodes": [
				{"id": "J1", "type": "junction", "coordinates": {}},
				{"id": "J2", "type": "junction", "coordinates": {"x": 1.0}},
				{"id": "J3", "type": "junction", "coordinates": {"x": 10.0, "y": 20.0}, "risk_level": "critical"},
				{"id": "J4", "type": "junction", "coordinates": null, "risk": "high"}
			],
			"pipes": []
		}"#;
		let snapshot: NetworkSnapshot = serde_json::from_str(json).expect("snapshot should parse");

		assert_eq!(snapshot.nodes.len(), 4);
		assert_eq!(snapshot.nodes[0].coordinates, None);
		assert_eq!(snapshot.nodes[1].coordinates, None);
		assert_eq!(snapshot.nodes[2].normalized(), Some((10.0, 20.0)));
		assert_eq!(snapshot.nodes[2].risk, None);
		assert_eq!(snapshot.nodes[3].coordinates, None);
		assert_eq!(snapshot.nodes[3].risk, Some(RiskLevel::High));
	}

	#[test]
	fn test_non_finite_position_is_ignored() {
		let node = Node {
			id: "J1".into(),
			node_type: NodeType::Junction,
			coordinates: Some(Position::Normalized { x: f64::NAN, y: 1.0 }),
			elevation: None,
			risk: None,
		};
		assert_eq!(node.gps(), None);
	}

	#[test]
	fn test_series_predictions_truncate_to_shortest() {
		let json = r#"{"leak_x": [100.0, 200.0, 300.0], "leak_y": [400.0, 500.0], "leak_size_lps": [1.0, 2.0, 3.0]}"#;
		let payload: PredictionsPayload = serde_json::from_str(json).expect("payload should parse");
		let predictions = payload.into_predictions();

		assert_eq!(predictions.len(), 2);
		assert_eq!(predictions[1].leak_x, Some(200.0));
		assert_eq!(predictions[1].leak_size_lps, 2.0);
	}

	#[test]
	fn test_single_prediction_payload() {
		let json = r#"{"node_id": "J7", "leak_x": 500.0, "leak_y": 500.0, "leak_size_lps": 4.5, "affected_pipes": ["P1"]}"#;
		let payload: PredictionsPayload = serde_json::from_str(json).expect("payload should parse");
		let predictions = payload.into_predictions();

		assert_eq!(predictions.len(), 1);
		assert_eq!(predictions[0].node_id.as_deref(), Some("J7"));
		assert!(predictions[0].affected_pipes.contains("P1"));
	}

	#[test]
	fn test_prediction_location_prefers_gps() {
		let prediction = LeakPrediction {
			leak_x: Some(0.0),
			leak_y: Some(0.0),
			leak_lat: Some(27.7),
			leak_lng: Some(85.3),
			..Default::default()
		};
		assert_eq!(prediction.location(), Some(GeoPoint { lat: 27.7, lng: 85.3 }));

		let normalized_only = LeakPrediction {
			leak_x: Some(500.0),
			leak_y: Some(500.0),
			..Default::default()
		};
		assert_eq!(normalized_only.location(), Some(to_gps(500.0, 500.0)));
		assert_eq!(LeakPrediction::default().location(), None);
	}

	#[test]
	fn test_negative_size_reads_as_zero() {
		let prediction = LeakPrediction {
			leak_size_lps: -3.0,
			..Default::default()
		};
		assert_eq!(prediction.size(), 0.0);
	}
}

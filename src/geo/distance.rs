use crate::network::Node;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters.
pub fn haversine_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
	let (d_lat, d_lng) = ((lat2 - lat1).to_radians(), (lng2 - lng1).to_radians());
	let a = (d_lat / 2.0).sin().powi(2)
		+ lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
	let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
	EARTH_RADIUS_M * c
}

#[derive(Clone, Copy, Debug)]
pub struct NearestNode<'a> {
	pub node: &'a Node,
	pub distance_m: f64,
}

/// Linear scan for the node closest to the target. Nodes without coordinates
/// are skipped; the first of equally distant nodes wins.
pub fn nearest_node<'a>(
	nodes: impl IntoIterator<Item = &'a Node>,
	lat: f64,
	lng: f64,
) -> Option<NearestNode<'a>> {
	if !lat.is_finite() || !lng.is_finite() {
		return None;
	}
	let mut best: Option<NearestNode<'a>> = None;
	for node in nodes {
		let Some(p) = node.gps() else { continue };
		let distance_m = haversine_meters(lat, lng, p.lat, p.lng);
		if best.is_none_or(|b| distance_m < b.distance_m) {
			best = Some(NearestNode { node, distance_m });
		}
	}
	best
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::network::{NodeType, Position};

	fn gps_node(id: &str, lat: f64, lng: f64) -> Node {
		Node {
			id: id.into(),
			node_type: NodeType::Junction,
			coordinates: Some(Position::Gps { lat, lng }),
			elevation: None,
			risk: None,
		}
	}

	#[test]
	fn test_haversine_zero_and_symmetric() {
		let pairs = [
			((27.70, 85.30), (27.80, 85.40)),
			((-33.86, 151.21), (51.50, -0.12)),
			((0.0, 179.9), (0.0, -179.9)),
		];
		for ((a_lat, a_lng), (b_lat, b_lng)) in pairs {
			assert_eq!(haversine_meters(a_lat, a_lng, a_lat, a_lng), 0.0);
			assert_eq!(
				haversine_meters(a_lat, a_lng, b_lat, b_lng),
				haversine_meters(b_lat, b_lng, a_lat, a_lng)
			);
		}
	}

	#[test]
	fn test_haversine_one_degree_of_latitude() {
		let d = haversine_meters(0.0, 0.0, 1.0, 0.0);
		assert!((d - 111_194.9).abs() < 1.0, "got {d}");
	}

	#[test]
	fn test_nearest_node_picks_closest() {
		let nodes = [gps_node("A", 27.70, 85.30), gps_node("B", 27.80, 85.40)];
		let nearest = nearest_node(&nodes, 27.71, 85.31).expect("should find a node");
		assert_eq!(nearest.node.id, "A");
		assert!(nearest.distance_m > 0.0);
	}

	#[test]
	fn test_nearest_node_empty_or_undefined_target() {
		let empty: [Node; 0] = [];
		assert!(nearest_node(&empty, 27.7, 85.3).is_none());
		let nodes = [gps_node("A", 27.70, 85.30)];
		assert!(nearest_node(&nodes, f64::NAN, 85.3).is_none());
	}

	#[test]
	fn test_nearest_node_tie_goes_to_first() {
		let nodes = [gps_node("first", 27.70, 85.30), gps_node("second", 27.70, 85.30)];
		let nearest = nearest_node(&nodes, 27.75, 85.35).expect("should find a node");
		assert_eq!(nearest.node.id, "first");
	}

	#[test]
	fn test_nearest_node_skips_missing_coordinates() {
		let mut blank = gps_node("blank", 0.0, 0.0);
		blank.coordinates = None;
		let nodes = [blank, gps_node("far", 28.5, 86.0)];
		let nearest = nearest_node(&nodes, 0.0, 0.0).expect("should find a node");
		assert_eq!(nearest.node.id, "far");
	}
}

use crate::network::Node;

/// Reference origin the simulation space is centred on (Kathmandu).
pub const ORIGIN: GeoPoint = GeoPoint {
	lat: 27.7172,
	lng: 85.3240,
};

/// Degrees spanned by 1000 normalized units.
pub const DEGREES_PER_SPAN: f64 = 0.02;

const SPAN: f64 = 1000.0;
const CENTER: f64 = 500.0;
const EMPTY_BOUNDS_HALF_SIDE: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
	pub lat: f64,
	pub lng: f64,
}

/// Axis-aligned latitude/longitude box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
	pub min: GeoPoint,
	pub max: GeoPoint,
}

impl GeoBounds {
	/// `[[min_lat, min_lng], [max_lat, max_lng]]`
	pub fn as_array(&self) -> [[f64; 2]; 2] {
		[[self.min.lat, self.min.lng], [self.max.lat, self.max.lng]]
	}

	pub fn center(&self) -> GeoPoint {
		GeoPoint {
			lat: (self.min.lat + self.max.lat) / 2.0,
			lng: (self.min.lng + self.max.lng) / 2.0,
		}
	}

	fn around(point: GeoPoint, half_side: f64) -> Self {
		Self {
			min: GeoPoint {
				lat: point.lat - half_side,
				lng: point.lng - half_side,
			},
			max: GeoPoint {
				lat: point.lat + half_side,
				lng: point.lng + half_side,
			},
		}
	}

	fn include(&mut self, p: GeoPoint) {
		self.min.lat = self.min.lat.min(p.lat);
		self.min.lng = self.min.lng.min(p.lng);
		self.max.lat = self.max.lat.max(p.lat);
		self.max.lng = self.max.lng.max(p.lng);
	}
}

/// Maps normalized simulation coordinates to GPS. Y is latitude, X longitude.
pub fn to_gps(x: f64, y: f64) -> GeoPoint {
	GeoPoint {
		lat: ORIGIN.lat + (y - CENTER) / SPAN * DEGREES_PER_SPAN,
		lng: ORIGIN.lng + (x - CENTER) / SPAN * DEGREES_PER_SPAN,
	}
}

/// Inverse of [`to_gps`], returning `(x, y)`.
pub fn from_gps(lat: f64, lng: f64) -> (f64, f64) {
	(
		(lng - ORIGIN.lng) / DEGREES_PER_SPAN * SPAN + CENTER,
		(lat - ORIGIN.lat) / DEGREES_PER_SPAN * SPAN + CENTER,
	)
}

/// Bounding box over every node with coordinates. Falls back to a small box
/// around [`ORIGIN`] when there is nothing to bound.
pub fn bounds_of<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> GeoBounds {
	let mut points = nodes.into_iter().filter_map(Node::gps);
	let Some(first) = points.next() else {
		return GeoBounds::around(ORIGIN, EMPTY_BOUNDS_HALF_SIDE);
	};
	let mut bounds = GeoBounds {
		min: first,
		max: first,
	};
	for p in points {
		bounds.include(p);
	}
	bounds
}

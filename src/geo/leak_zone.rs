//! Concentric-ellipse "heat" zone drawn around a predicted leak.

use std::f64::consts::PI;

use super::{GeoBounds, GeoPoint};

pub const BASE_RADIUS_M: f64 = 80.0;
pub const MAX_SIZE_SCALE: f64 = 3.0;
pub const SIZE_DIVISOR: f64 = 30.0;
pub const ASPECT_RATIO: f64 = 1.5;
pub const EDGE_PADDING_M: f64 = 20.0;
pub const MIN_RADIUS_X_M: f64 = 30.0;
pub const MIN_RADIUS_Y_M: f64 = 20.0;
pub const LAYERS: usize = 5;
pub const SEGMENTS: usize = 36;

/// Local flat-earth approximation used instead of Haversine.
const METERS_PER_DEGREE: f64 = 111_320.0;
const LAYER_SHRINK: f64 = 0.7;

#[derive(Clone, Debug, PartialEq)]
pub struct ZoneLayer {
	/// Closed ring: the last point repeats the first.
	pub ring: Vec<GeoPoint>,
	pub fill_opacity: f64,
	pub stroked: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeakZone {
	pub center: GeoPoint,
	pub radius_x_m: f64,
	pub radius_y_m: f64,
	/// Outermost first.
	pub layers: Vec<ZoneLayer>,
}

fn lng_meters_per_degree(lat: f64) -> f64 {
	METERS_PER_DEGREE * lat.to_radians().cos()
}

/// Horizontal and vertical radii in meters for a leak of `size` litres per
/// second, kept inside `bounds` when there is room.
pub fn zone_radii(center: GeoPoint, size: f64, bounds: Option<&GeoBounds>) -> (f64, f64) {
	let size = if size.is_finite() { size.max(0.0) } else { 0.0 };
	let scale = (1.0 + size / SIZE_DIVISOR).min(MAX_SIZE_SCALE);
	let mut radius_y = BASE_RADIUS_M * scale;
	let mut radius_x = radius_y * ASPECT_RATIO;

	if let Some(b) = bounds {
		let lng_m = lng_meters_per_degree(center.lat);
		let room_y = (center.lat - b.min.lat).min(b.max.lat - center.lat) * METERS_PER_DEGREE
			- EDGE_PADDING_M;
		let room_x = (center.lng - b.min.lng).min(b.max.lng - center.lng) * lng_m - EDGE_PADDING_M;
		if room_x > 0.0 && room_y > 0.0 {
			radius_x = radius_x.min(room_x);
			radius_y = radius_y.min(room_y);
		}
	}

	(radius_x.max(MIN_RADIUS_X_M), radius_y.max(MIN_RADIUS_Y_M))
}

/// Outer-layer fill opacity, capped low so the map stays legible.
pub fn zone_opacity(size: f64) -> f64 {
	(0.15 + size.max(0.0) / 200.0).min(0.3)
}

fn ellipse_ring(center: GeoPoint, radius_x: f64, radius_y: f64) -> Vec<GeoPoint> {
	let lng_m = lng_meters_per_degree(center.lat);
	(0..=SEGMENTS)
		.map(|j| {
			let angle = j as f64 / SEGMENTS as f64 * 2.0 * PI;
			GeoPoint {
				lat: center.lat + radius_y / METERS_PER_DEGREE * angle.sin(),
				lng: center.lng + radius_x / lng_m * angle.cos(),
			}
		})
		.collect()
}

/// Builds the layered zone around `center`.
pub fn leak_zone(center: GeoPoint, size: f64, bounds: Option<&GeoBounds>) -> LeakZone {
	let (radius_x_m, radius_y_m) = zone_radii(center, size, bounds);
	let opacity = zone_opacity(size);
	let layers = (0..LAYERS)
		.map(|i| {
			let t = i as f64 / LAYERS as f64;
			let factor = 1.0 - t * LAYER_SHRINK;
			ZoneLayer {
				ring: ellipse_ring(center, radius_x_m * factor, radius_y_m * factor),
				fill_opacity: opacity * (1.0 - t),
				stroked: i == 0,
			}
		})
		.collect();

	LeakZone {
		center,
		radius_x_m,
		radius_y_m,
		layers,
	}
}

//! Geographic helpers: simulation-space ↔ GPS mapping, distances and the
//! leak-zone overlay geometry.

mod coords;
mod distance;
pub mod leak_zone;

pub use coords::{DEGREES_PER_SPAN, GeoBounds, GeoPoint, ORIGIN, bounds_of, from_gps, to_gps};
pub use distance::{EARTH_RADIUS_M, NearestNode, haversine_meters, nearest_node};
pub use leak_zone::{LeakZone, ZoneLayer, leak_zone};

//! Great-circle math for route tracking.
//!
//! Provides haversine distance, initial bearing and nearest-vertex search over
//! route polylines. All functions are pure and operate on WGS84 degrees.
//!
//! # Closest point
//!
//! [`closest_point_on_polyline`] returns the nearest *vertex*, not a projection
//! onto the segments between vertices. Route polylines from the routing
//! provider are densely sampled, so the difference stays within a few meters
//! and distance readouts match what earlier releases displayed.

mod types;

pub use types::{Coordinate, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Mean Earth radius in meters used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Nearest route vertex to a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// Index of the vertex in the polyline.
    pub index: usize,
    /// Great-circle distance from the position to that vertex.
    pub distance_meters: f64,
}

/// Haversine great-circle distance between two coordinates in meters.
#[inline]
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Rounding can push h fractionally above 1 for antipodal points
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `a` to `b` in degrees, in `[0, 360)`.
///
/// 0 = North, 90 = East. Identical points yield 0.
pub fn bearing_degrees(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Signed change of direction from `incoming` to `outgoing` bearing.
///
/// Positive values turn right, negative values turn left. The result lies in
/// `(-180, 180]`.
pub fn relative_turn_degrees(incoming: f64, outgoing: f64) -> f64 {
    let delta = normalize_degrees(outgoing - incoming);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Find the polyline vertex nearest to `fix`.
///
/// Linear scan over every vertex; ties resolve to the lowest index.
/// Returns `None` only for an empty polyline.
pub fn closest_point_on_polyline(fix: Coordinate, coords: &[Coordinate]) -> Option<ClosestPoint> {
    let mut best: Option<ClosestPoint> = None;

    for (index, vertex) in coords.iter().enumerate() {
        let distance = distance_meters(fix, *vertex);
        let is_better = match &best {
            Some(prev) => distance < prev.distance_meters,
            None => true,
        };
        if is_better {
            best = Some(ClosestPoint {
                index,
                distance_meters: distance,
            });
        }
    }

    best
}

/// Total length of a polyline in meters.
pub fn polyline_length_meters(coords: &[Coordinate]) -> f64 {
    path_distance_meters(coords, 0)
}

/// Distance along the polyline from vertex `from` to the last vertex.
///
/// Returns 0 when `from` is at or past the last vertex.
pub fn path_distance_meters(coords: &[Coordinate], from: usize) -> f64 {
    coords
        .get(from..)
        .unwrap_or_default()
        .windows(2)
        .map(|w| distance_meters(w[0], w[1]))
        .sum()
}

fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

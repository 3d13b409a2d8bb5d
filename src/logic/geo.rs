//! Great-circle geometry
//!
//! Haversine distance over a spherical earth. All radii are in meters.

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Padding added to latitude bounds so the coarse storage pre-filter never
/// drops a record the exact distance check would keep.
const LATITUDE_BOUND_PADDING_DEG: f64 = 1e-6;

/// A coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Build a point from nullable columns; `None` unless both are present.
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Self { lat, lon }),
            _ => None,
        }
    }
}

/// Haversine distance between two points, in meters.
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Inclusive: a point exactly on the boundary is within the radius.
pub fn within_radius(center: GeoPoint, point: GeoPoint, radius_m: f64) -> bool {
    distance_m(center, point) <= radius_m
}

/// Latitude band `(min, max)` that contains every point within `radius_m`.
pub fn latitude_bounds(center: GeoPoint, radius_m: f64) -> (f64, f64) {
    let delta = (radius_m / EARTH_RADIUS_M).to_degrees() + LATITUDE_BOUND_PADDING_DEG;
    ((center.lat - delta).max(-90.0), (center.lat + delta).min(90.0))
}

use geo::Point;
use serde::{Deserialize, Serialize};

/// Raw position fix reported by a client at its own cadence.
///
/// Only the latest fix is kept per session; there is no history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    /// Speed over ground in meters per second.
    pub speed: f64,
}

impl Position {
    /// Geometry of the fix as lon/lat.
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// A fix is usable when its coordinates are on the globe and its speed
    /// is finite and non-negative.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
            && self.speed.is_finite()
            && self.speed >= 0.0
    }
}

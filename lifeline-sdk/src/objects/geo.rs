//! Geographic coordinate types shared across the API surface.

use serde::{Deserialize, Serialize};

/// A WGS-84 coordinate pair, longitude first.
///
/// Carried verbatim in request and response bodies. Range validation
/// happens server-side when a point enters the system; see
/// [`Point::in_bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub longitude: f64,
    pub latitude: f64,
}

impl Point {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Whether the coordinates are within longitude [-180, 180] and
    /// latitude [-90, 90], and finite.
    pub fn in_bounds(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_check() {
        assert!(Point::new(87.28, 26.81).in_bounds());
        assert!(Point::new(-180.0, 90.0).in_bounds());
        assert!(!Point::new(180.5, 0.0).in_bounds());
        assert!(!Point::new(0.0, -90.01).in_bounds());
        assert!(!Point::new(f64::NAN, 0.0).in_bounds());
    }
}

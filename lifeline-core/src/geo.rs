//! Great-circle distance math for proximity matching.

use lifeline_sdk::objects::Point;

use crate::error::CoreError;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points, in meters.
///
/// Good to well under 0.5% over the distances this system matches
/// across, which is far finer than the radius granularity it is used
/// with.
pub fn haversine_distance_m(a: Point, b: Point) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    // Clamp against rounding pushing sqrt(h) past 1 for near-antipodal
    // pairs, which would turn asin into NaN.
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Reject a point outside WGS-84 bounds with a field-level validation
/// error.
pub fn validate_point(field: &'static str, point: Point) -> Result<(), CoreError> {
    if point.in_bounds() {
        Ok(())
    } else {
        Err(CoreError::validation(
            field,
            "longitude must be in [-180, 180] and latitude in [-90, 90]",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance() {
        let p = Point::new(87.28, 26.81);
        assert_eq!(haversine_distance_m(p, p), 0.0);
    }

    #[test]
    fn known_distance_biratnagar_to_offset() {
        // One degree of latitude is ~111.2 km everywhere.
        let a = Point::new(87.28, 26.81);
        let b = Point::new(87.28, 27.81);
        let d = haversine_distance_m(a, b);
        assert!((d - 111_195.0).abs() < 500.0, "got {d}");
    }

    #[test]
    fn symmetric() {
        let a = Point::new(85.32, 27.72);
        let b = Point::new(87.28, 26.81);
        assert_eq!(haversine_distance_m(a, b), haversine_distance_m(b, a));
    }

    #[test]
    fn out_of_bounds_point_is_a_validation_error() {
        let err = validate_point("location", Point::new(200.0, 0.0));
        assert!(matches!(
            err,
            Err(CoreError::Validation { field: "location", .. })
        ));
    }
}

//! Geodesic helpers for proximity queries.
//!
//! All functions work on a spherical earth using the WGS-84 mean radius.
//!
//! # Coordinate System
//!
//! - Latitude: degrees north (-90 to 90)
//! - Longitude: degrees east (-180 to 180)
//! - Heading/bearing: degrees true (0-360, 0=north, 90=east)
//! - Distance: meters

mod bbox;

pub use bbox::BoundingBox;

/// Mean earth radius in meters (WGS-84 mean radius).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Meters per degree of latitude used by the planar bounding box approximation.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Calculate the great-circle distance between two positions.
///
/// Uses the haversine formula. The square-root argument is clamped to
/// `[0, 1]` so coincident and antipodal points stay finite.
///
/// # Example
///
/// ```
/// use lightscout::geo::distance_m;
///
/// // One degree of latitude is roughly 111 km
/// let d = distance_m(45.0, -75.0, 46.0, -75.0);
/// assert!((d - 111_195.0).abs() < 10.0);
/// ```
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Calculate the initial bearing from one position to another.
///
/// Returns the forward azimuth in degrees, normalized to `[0, 360)`.
///
/// # Example
///
/// ```
/// use lightscout::geo::bearing_deg;
///
/// let east = bearing_deg(45.0, -75.0, 45.0, -74.9);
/// assert!((east - 90.0).abs() < 0.1);
/// ```
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let y = delta_lon.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    normalize_heading(y.atan2(x).to_degrees())
}

/// Normalize a heading to `[0, 360)` degrees.
pub fn normalize_heading(heading: f64) -> f64 {
    let h = heading % 360.0;
    let h = if h < 0.0 { h + 360.0 } else { h };
    // -1e-15 % 360 + 360 rounds up to exactly 360.0
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}

/// Calculate the minimal absolute difference between two headings.
///
/// Handles wraparound (e.g., 350° to 10° is 20°, not 340°). Result is in
/// `[0, 180]`.
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let diff = (normalize_heading(a) - normalize_heading(b)).abs();
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Calculate a conservative bounding box around a search circle.
///
/// See [`BoundingBox::around`] for the widening rules.
pub fn bounding_box(lat: f64, lon: f64, radius_m: f64) -> BoundingBox {
    BoundingBox::around(lat, lon, radius_m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_coincident_is_zero() {
        assert_eq!(distance_m(45.0, -75.0, 45.0, -75.0), 0.0);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let d = distance_m(0.0, 0.0, 1.0, 0.0);
        let expected = EARTH_RADIUS_M * 1.0_f64.to_radians();
        assert!((d - expected).abs() < 1e-6, "got {}", d);
    }

    #[test]
    fn test_distance_antipodal_is_finite() {
        let d = distance_m(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - EARTH_RADIUS_M * std::f64::consts::PI).abs() < 1.0);

        let d = distance_m(90.0, 0.0, -90.0, 0.0);
        assert!((d - EARTH_RADIUS_M * std::f64::consts::PI).abs() < 1.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = distance_m(43.6532, -79.3832, 43.6548, -79.3806);
        let b = distance_m(43.6548, -79.3806, 43.6532, -79.3832);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        // North
        assert!(bearing_deg(45.0, -75.0, 45.1, -75.0).abs() < 0.1);
        // East
        assert!((bearing_deg(45.0, -75.0, 45.0, -74.9) - 90.0).abs() < 0.1);
        // South
        assert!((bearing_deg(45.0, -75.0, 44.9, -75.0) - 180.0).abs() < 0.1);
        // West
        assert!((bearing_deg(45.0, -75.0, 45.0, -75.1) - 270.0).abs() < 0.1);
    }

    #[test]
    fn test_bearing_range() {
        let b = bearing_deg(10.0, 10.0, 9.0, 9.999);
        assert!((0.0..360.0).contains(&b));
    }

    #[test]
    fn test_normalize_heading() {
        assert_eq!(normalize_heading(0.0), 0.0);
        assert_eq!(normalize_heading(90.0), 90.0);
        assert_eq!(normalize_heading(-90.0), 270.0);
        assert_eq!(normalize_heading(360.0), 0.0);
        assert_eq!(normalize_heading(450.0), 90.0);
        assert_eq!(normalize_heading(-1e-15), 0.0);
    }

    #[test]
    fn test_angular_difference_wraparound() {
        assert!((angular_difference(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((angular_difference(10.0, 350.0) - 20.0).abs() < 1e-9);
        assert!((angular_difference(0.0, 180.0) - 180.0).abs() < 1e-9);
        assert!((angular_difference(90.0, 90.0)).abs() < 1e-9);
        assert!((angular_difference(-45.0, 45.0) - 90.0).abs() < 1e-9);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_angular_difference_in_range(a in -720.0..720.0_f64, b in -720.0..720.0_f64) {
                let d = angular_difference(a, b);
                prop_assert!((0.0..=180.0).contains(&d), "difference {} out of range", d);
            }

            #[test]
            fn test_bearing_in_range(
                lat1 in -89.0..89.0_f64,
                lon1 in -180.0..180.0_f64,
                lat2 in -89.0..89.0_f64,
                lon2 in -180.0..180.0_f64,
            ) {
                let b = bearing_deg(lat1, lon1, lat2, lon2);
                prop_assert!((0.0..360.0).contains(&b), "bearing {} out of range", b);
            }

            #[test]
            fn test_distance_non_negative_and_bounded(
                lat1 in -90.0..=90.0_f64,
                lon1 in -180.0..=180.0_f64,
                lat2 in -90.0..=90.0_f64,
                lon2 in -180.0..=180.0_f64,
            ) {
                let d = distance_m(lat1, lon1, lat2, lon2);
                prop_assert!(d >= 0.0);
                prop_assert!(d <= EARTH_RADIUS_M * std::f64::consts::PI + 1e-6);
            }
        }
    }
}

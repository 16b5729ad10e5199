//! Rectangular pre-filter for radius queries.

use super::{EARTH_RADIUS_M, METERS_PER_DEGREE};

/// Relative widening applied to both deltas to absorb floating point error
/// between the box bounds and the haversine check.
const WIDEN_FACTOR: f64 = 1.000_001;

/// A latitude/longitude rectangle.
///
/// Longitude bounds may extend past ±180° when the box crosses the
/// antimeridian; [`contains`](Self::contains) accounts for the wrap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a box from explicit bounds.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Approximate box around a circle of `radius_m` centered on `(lat, lon)`.
    ///
    /// Starts from the planar approximation (111,320 m per degree of
    /// latitude, `111,320 * cos(lat)` m per degree of longitude) and widens
    /// each delta to at least the spherical extent of the circle, so the box
    /// never excludes a point within `radius_m`:
    ///
    /// - latitude delta is at least the angular radius
    /// - longitude delta is at least `asin(sin(d) / cos(lat))`
    /// - longitude spans the full range when the circle reaches a pole
    pub fn around(lat: f64, lon: f64, radius_m: f64) -> Self {
        let angular = radius_m / EARTH_RADIUS_M;
        let lat_delta = (radius_m / METERS_PER_DEGREE).max(angular.to_degrees()) * WIDEN_FACTOR;

        let min_lat = (lat - lat_delta).max(-90.0);
        let max_lat = (lat + lat_delta).min(90.0);

        if lat - lat_delta <= -90.0 || lat + lat_delta >= 90.0 {
            return Self::new(min_lat, max_lat, -180.0, 180.0);
        }

        let cos_lat = lat.to_radians().cos();
        let planar = radius_m / (METERS_PER_DEGREE * cos_lat);
        let ratio = angular.sin() / cos_lat;
        if !ratio.is_finite() || ratio >= 1.0 {
            return Self::new(min_lat, max_lat, -180.0, 180.0);
        }
        let spherical = ratio.asin().to_degrees();

        let lon_delta = planar.max(spherical) * WIDEN_FACTOR;
        if lon_delta >= 180.0 {
            return Self::new(min_lat, max_lat, -180.0, 180.0);
        }

        Self::new(min_lat, max_lat, lon - lon_delta, lon + lon_delta)
    }

    /// Whether the box covers every longitude.
    pub fn spans_all_longitudes(&self) -> bool {
        self.max_lon - self.min_lon >= 360.0 || (self.min_lon <= -180.0 && self.max_lon >= 180.0)
    }

    /// Check whether a coordinate lies inside the box (inclusive bounds).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        self.contains_lon(lon)
    }

    /// Check the longitude bounds only, honoring antimeridian wrap.
    pub fn contains_lon(&self, lon: f64) -> bool {
        if self.spans_all_longitudes() {
            return true;
        }
        [lon, lon - 360.0, lon + 360.0]
            .iter()
            .any(|l| *l >= self.min_lon && *l <= self.max_lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::distance_m;

    #[test]
    fn test_planar_deltas_at_mid_latitude() {
        let bbox = BoundingBox::around(45.0, -75.0, 500.0);

        let lat_delta = (bbox.max_lat - bbox.min_lat) / 2.0;
        let lon_delta = (bbox.max_lon - bbox.min_lon) / 2.0;

        // Spherical extent (R / 111,195 m) exceeds the planar 500 / 111,320
        let angular_deg = (500.0 / EARTH_RADIUS_M).to_degrees();
        assert!(lat_delta >= angular_deg);
        assert!((lat_delta - angular_deg).abs() < 1e-6);

        let planar_lon = 500.0 / (METERS_PER_DEGREE * 45.0_f64.to_radians().cos());
        assert!(lon_delta >= planar_lon);
        assert!(lon_delta < planar_lon * 1.01);
    }

    #[test]
    fn test_contains_center() {
        let bbox = BoundingBox::around(43.6532, -79.3832, 500.0);
        assert!(bbox.contains(43.6532, -79.3832));
        assert!(!bbox.contains(43.7, -79.3832));
    }

    #[test]
    fn test_due_north_edge_point_inside() {
        // A point exactly 500 m due north must fall inside the box
        let d_deg = (500.0 / EARTH_RADIUS_M).to_degrees();
        let bbox = BoundingBox::around(45.0, -75.0, 500.0);
        assert!(bbox.contains(45.0 + d_deg, -75.0));
        assert!((distance_m(45.0, -75.0, 45.0 + d_deg, -75.0) - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_pole_spans_all_longitudes() {
        let bbox = BoundingBox::around(89.999, 10.0, 500.0);
        assert!(bbox.spans_all_longitudes());
        assert_eq!(bbox.max_lat, 90.0);
        assert!(bbox.contains(89.9995, -170.0));
    }

    #[test]
    fn test_near_pole_uses_spherical_extent() {
        // Close to, but not touching, the pole: planar undershoots badly
        let bbox = BoundingBox::around(89.9, 0.0, 9_000.0);
        let lon_delta = (bbox.max_lon - bbox.min_lon) / 2.0;
        let d = 9_000.0 / EARTH_RADIUS_M;
        let spherical = (d.sin() / 89.9_f64.to_radians().cos()).asin().to_degrees();
        assert!(lon_delta >= spherical);
    }

    #[test]
    fn test_antimeridian_wrap() {
        let bbox = BoundingBox::around(0.0, 179.999, 1_000.0);
        assert!(bbox.max_lon > 180.0);
        assert!(bbox.contains(0.0, -179.999));
        assert!(bbox.contains(0.0, 179.995));
        assert!(!bbox.contains(0.0, -179.0));
    }

    #[test]
    fn test_huge_radius_is_whole_world() {
        let bbox = BoundingBox::around(0.0, 0.0, 30_000_000.0);
        assert!(bbox.spans_all_longitudes());
        assert_eq!(bbox.min_lat, -90.0);
        assert_eq!(bbox.max_lat, 90.0);
    }

    mod property_tests {
        use super::*;
        use crate::geo::bearing_deg;
        use proptest::prelude::*;

        /// Destination point along a great circle.
        fn destination(lat: f64, lon: f64, bearing: f64, dist_m: f64) -> (f64, f64) {
            let d = dist_m / EARTH_RADIUS_M;
            let lat1 = lat.to_radians();
            let lon1 = lon.to_radians();
            let brg = bearing.to_radians();
            let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * brg.cos()).asin();
            let lon2 =
                lon1 + (brg.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());
            let mut lon2 = lon2.to_degrees();
            while lon2 > 180.0 {
                lon2 -= 360.0;
            }
            while lon2 < -180.0 {
                lon2 += 360.0;
            }
            (lat2.to_degrees(), lon2)
        }

        proptest! {
            #[test]
            fn test_box_never_excludes_points_within_radius(
                lat in -90.0..=90.0_f64,
                lon in -180.0..=180.0_f64,
                radius in 1.0..50_000.0_f64,
                bearing in 0.0..360.0_f64,
                fraction in 0.0..=1.0_f64,
            ) {
                let (plat, plon) = destination(lat, lon, bearing, radius * fraction);
                let bbox = BoundingBox::around(lat, lon, radius);
                if distance_m(lat, lon, plat, plon) <= radius {
                    prop_assert!(
                        bbox.contains(plat, plon),
                        "({}, {}) r={} excluded ({}, {}) box={:?} bearing={}",
                        lat, lon, radius, plat, plon, bbox,
                        bearing_deg(lat, lon, plat, plon)
                    );
                }
            }
        }
    }
}

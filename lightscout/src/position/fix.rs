//! Position fix model.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A usable position fix from the GPS receiver.
///
/// Only fixes with `fix_quality > 0` are ever constructed by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude above mean sea level in meters.
    pub altitude: Option<f64>,
    /// Ground speed in meters per second.
    pub speed_mps: Option<f64>,
    /// True track in degrees.
    pub heading_deg: Option<f64>,
    pub satellite_count: u32,
    /// GGA fix quality indicator (1 = GPS, 2 = DGPS, 4 = RTK, ...).
    pub fix_quality: u8,
    /// When the fix was received.
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    /// Ground speed in km/h, rounded to the nearest integer.
    pub fn speed_kmh(&self) -> Option<u32> {
        self.speed_mps.map(|mps| (mps * 3.6).round().max(0.0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_kmh() {
        let fix = Fix {
            latitude: 45.0,
            longitude: -75.0,
            altitude: None,
            speed_mps: Some(13.9),
            heading_deg: None,
            satellite_count: 8,
            fix_quality: 1,
            timestamp: Utc::now(),
        };
        assert_eq!(fix.speed_kmh(), Some(50));
        assert_eq!(Fix { speed_mps: None, ..fix }.speed_kmh(), None);
    }
}

//! Proximity alerts.
//!
//! The nearest light ahead is classified into a [`Zone`] and reported as an
//! [`Alert`] to the in-process callback and, through [`ActuatorProtocol`], to
//! the external actuator.

mod protocol;
mod zone;

use serde::Serialize;

use crate::index::NearbyLight;

pub use protocol::ActuatorProtocol;
pub use zone::{Zone, ZoneThresholds, DEFAULT_APPROACHING_M, DEFAULT_IMMINENT_M, DEFAULT_NEAR_M};

/// Proximity alert for the nearest light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Alert {
    pub light_id: i64,
    pub distance_m: f64,
    pub lat: f64,
    pub lon: f64,
    pub zone: Zone,
}

impl Alert {
    pub fn for_light(light: &NearbyLight, thresholds: &ZoneThresholds) -> Self {
        Self {
            light_id: light.id,
            distance_m: light.distance_m,
            lat: light.lat,
            lon: light.lon,
            zone: thresholds.classify(light.distance_m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_for_light() {
        let light = NearbyLight {
            id: 42,
            lat: 45.0,
            lon: -75.0,
            distance_m: 75.0,
        };
        let alert = Alert::for_light(&light, &ZoneThresholds::default());
        assert_eq!(alert.light_id, 42);
        assert_eq!(alert.zone, Zone::Near);
        assert_eq!(alert.distance_m, 75.0);
    }
}

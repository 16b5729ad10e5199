//! Distance zones.

use std::fmt;

use serde::Serialize;

/// Default upper bound of the imminent zone in meters.
pub const DEFAULT_IMMINENT_M: f64 = 50.0;
/// Default upper bound of the near zone in meters.
pub const DEFAULT_NEAR_M: f64 = 100.0;
/// Default upper bound of the approaching zone in meters.
pub const DEFAULT_APPROACHING_M: f64 = 250.0;

/// How close the nearest light is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Imminent,
    Near,
    Approaching,
    Far,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Imminent, Zone::Near, Zone::Approaching, Zone::Far];

    /// Classify a distance with the default thresholds.
    pub fn classify(distance_m: f64) -> Self {
        ZoneThresholds::default().classify(distance_m)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Imminent => "imminent",
            Zone::Near => "near",
            Zone::Approaching => "approaching",
            Zone::Far => "far",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive upper bounds of each zone.
///
/// Anything beyond `approaching_m` is [`Zone::Far`]. Classification is a pure
/// function of distance; there is no hysteresis between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneThresholds {
    pub imminent_m: f64,
    pub near_m: f64,
    pub approaching_m: f64,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            imminent_m: DEFAULT_IMMINENT_M,
            near_m: DEFAULT_NEAR_M,
            approaching_m: DEFAULT_APPROACHING_M,
        }
    }
}

impl ZoneThresholds {
    pub fn new(imminent_m: f64, near_m: f64, approaching_m: f64) -> Self {
        Self {
            imminent_m,
            near_m,
            approaching_m,
        }
    }

    /// Thresholds must be finite, non-negative and non-decreasing.
    pub fn is_valid(&self) -> bool {
        let all_finite = [self.imminent_m, self.near_m, self.approaching_m]
            .iter()
            .all(|m| m.is_finite());
        all_finite
            && self.imminent_m >= 0.0
            && self.imminent_m <= self.near_m
            && self.near_m <= self.approaching_m
    }

    pub fn classify(&self, distance_m: f64) -> Zone {
        if distance_m <= self.imminent_m {
            Zone::Imminent
        } else if distance_m <= self.near_m {
            Zone::Near
        } else if distance_m <= self.approaching_m {
            Zone::Approaching
        } else {
            Zone::Far
        }
    }
}

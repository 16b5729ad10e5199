//! Line protocol spoken to the alert actuator.
//!
//! Alert lines are `<TOKEN>,<distance_m>,<speed_kmh>` with integer values.
//! A raw distance line `DIST,<distance_m>` is also available.

use super::zone::Zone;

/// Per-zone tokens written to the actuator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorProtocol {
    pub imminent: String,
    pub near: String,
    pub approaching: String,
    pub far: String,
    /// Written once when the nearby list becomes empty.
    pub idle: String,
}

impl Default for ActuatorProtocol {
    fn default() -> Self {
        Self {
            imminent: "IMMINENT".to_string(),
            near: "NEAR".to_string(),
            approaching: "APPROACHING".to_string(),
            far: "FAR".to_string(),
            idle: "IDLE".to_string(),
        }
    }
}

impl ActuatorProtocol {
    pub fn token(&self, zone: Zone) -> &str {
        match zone {
            Zone::Imminent => &self.imminent,
            Zone::Near => &self.near,
            Zone::Approaching => &self.approaching,
            Zone::Far => &self.far,
        }
    }

    /// Alert line for the nearest light. Unknown speed is sent as 0.
    pub fn alert_line(&self, zone: Zone, distance_m: f64, speed_kmh: Option<u32>) -> String {
        format!(
            "{},{},{}",
            self.token(zone),
            distance_m.round().max(0.0) as u64,
            speed_kmh.unwrap_or(0)
        )
    }

    /// Line written when no light is ahead anymore.
    pub fn idle_line(&self, speed_kmh: Option<u32>) -> String {
        format!("{},0,{}", self.idle, speed_kmh.unwrap_or(0))
    }

    /// Raw distance line.
    pub fn distance_line(distance_m: f64) -> String {
        format!("DIST,{:.1}", distance_m)
    }

    /// First token that would break line framing, if any.
    pub fn invalid_token(&self) -> Option<&str> {
        [&self.imminent, &self.near, &self.approaching, &self.far, &self.idle]
            .into_iter()
            .find(|t| t.is_empty() || !t.is_ascii() || t.contains([',', '\n', '\r']))
            .map(|t| t.as_str())
    }
}

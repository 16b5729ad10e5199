//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::alert::{ActuatorProtocol, ZoneThresholds};
use crate::index::DEFAULT_HEADING_CONE_DEG;

/// Default GPS serial device.
pub const DEFAULT_SENSOR_CHANNEL: &str = "/dev/ttyUSB0";
/// Default GPS baud rate (u-blox NEO-M8N factory setting).
pub const DEFAULT_SENSOR_BAUD: u32 = 9600;
/// Default actuator baud rate.
pub const DEFAULT_ACTUATOR_BAUD: u32 = 115_200;
/// Default dataset location.
pub const DEFAULT_DATASET_PATH: &str = "data/traffic_lights.json";
/// Default time between proximity queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Default search radius in meters.
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 500.0;
/// Default sensor read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(250);
/// Default time allowed for each worker thread to exit on stop.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
/// Upper bound for intervals, pauses and timeouts. Worker threads compute
/// deadlines as `Instant::now() + interval`.
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Everything the pipeline needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Sensor identifier: serial path, `tcp://host:port` or `file://path`.
    pub sensor_channel: String,
    pub sensor_baud: u32,
    pub sensor_read_timeout: Duration,
    /// Pause after a sensor read error.
    pub sensor_retry_pause: Duration,
    pub dataset_path: PathBuf,
    pub poll_interval: Duration,
    pub search_radius_m: f64,
    /// Half-width of the forward cone in degrees.
    pub heading_cone_deg: f64,
    /// Actuator identifier. `None` disables actuator output.
    pub actuator_channel: Option<String>,
    pub actuator_baud: u32,
    pub zones: ZoneThresholds,
    pub actuator_protocol: ActuatorProtocol,
    /// How long a light that left the heading cone stays in the results.
    /// Zero disables retention.
    pub passed_grace: Duration,
    pub join_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sensor_channel: DEFAULT_SENSOR_CHANNEL.to_string(),
            sensor_baud: DEFAULT_SENSOR_BAUD,
            sensor_read_timeout: DEFAULT_READ_TIMEOUT,
            sensor_retry_pause: crate::position::DEFAULT_RETRY_PAUSE,
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            poll_interval: DEFAULT_POLL_INTERVAL,
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            heading_cone_deg: DEFAULT_HEADING_CONE_DEG,
            actuator_channel: None,
            actuator_baud: DEFAULT_ACTUATOR_BAUD,
            zones: ZoneThresholds::default(),
            actuator_protocol: ActuatorProtocol::default(),
            passed_grace: Duration::ZERO,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sensor(mut self, channel: impl Into<String>, baud: u32) -> Self {
        self.sensor_channel = channel.into();
        self.sensor_baud = baud;
        self
    }

    pub fn with_sensor_read_timeout(mut self, timeout: Duration) -> Self {
        self.sensor_read_timeout = timeout;
        self
    }

    pub fn with_sensor_retry_pause(mut self, pause: Duration) -> Self {
        self.sensor_retry_pause = pause;
        self
    }

    pub fn with_dataset(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_path = path.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_search_radius(mut self, radius_m: f64) -> Self {
        self.search_radius_m = radius_m;
        self
    }

    pub fn with_heading_cone(mut self, cone_deg: f64) -> Self {
        self.heading_cone_deg = cone_deg;
        self
    }

    pub fn with_actuator(mut self, channel: impl Into<String>, baud: u32) -> Self {
        self.actuator_channel = Some(channel.into());
        self.actuator_baud = baud;
        self
    }

    pub fn without_actuator(mut self) -> Self {
        self.actuator_channel = None;
        self
    }

    pub fn with_zones(mut self, zones: ZoneThresholds) -> Self {
        self.zones = zones;
        self
    }

    pub fn with_actuator_protocol(mut self, protocol: ActuatorProtocol) -> Self {
        self.actuator_protocol = protocol;
        self
    }

    pub fn with_passed_grace(mut self, grace: Duration) -> Self {
        self.passed_grace = grace;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Check values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.sensor_channel.trim().is_empty() {
            return Err("sensor channel is empty".to_string());
        }
        if self.poll_interval.is_zero() {
            return Err("poll interval must be greater than zero".to_string());
        }
        for (name, value) in [
            ("poll interval", self.poll_interval),
            ("sensor read timeout", self.sensor_read_timeout),
            ("sensor retry pause", self.sensor_retry_pause),
            ("join timeout", self.join_timeout),
        ] {
            if value > MAX_INTERVAL {
                return Err(format!("{} of {:?} exceeds {:?}", name, value, MAX_INTERVAL));
            }
        }
        if !self.search_radius_m.is_finite() || self.search_radius_m <= 0.0 {
            return Err(format!(
                "search radius {} must be positive",
                self.search_radius_m
            ));
        }
        if !(0.0..=180.0).contains(&self.heading_cone_deg) {
            return Err(format!(
                "heading cone {} outside [0, 180]",
                self.heading_cone_deg
            ));
        }
        if !self.zones.is_valid() {
            return Err(format!("zone thresholds {:?} are not ordered", self.zones));
        }
        if let Some(token) = self.actuator_protocol.invalid_token() {
            return Err(format!(
                "actuator token '{}' is not a plain ASCII word",
                token
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.sensor_baud, 9600);
        assert_eq!(config.actuator_baud, 115_200);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.search_radius_m, 500.0);
        assert_eq!(config.heading_cone_deg, 90.0);
        assert_eq!(config.passed_grace, Duration::ZERO);
        assert_eq!(config.join_timeout, Duration::from_secs(2));
        assert!(config.actuator_channel.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = PipelineConfig::new()
            .with_sensor("tcp://localhost:2947", 0)
            .with_dataset("/data/lights.json.gz")
            .with_actuator("/dev/ttyACM0", 57_600)
            .with_search_radius(300.0)
            .with_heading_cone(45.0)
            .with_poll_interval(Duration::from_millis(200))
            .with_passed_grace(Duration::from_secs(3));

        assert_eq!(config.sensor_channel, "tcp://localhost:2947");
        assert_eq!(config.dataset_path, PathBuf::from("/data/lights.json.gz"));
        assert_eq!(config.actuator_channel.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.actuator_baud, 57_600);
        assert_eq!(config.search_radius_m, 300.0);
        assert_eq!(config.passed_grace, Duration::from_secs(3));
        assert!(config.clone().without_actuator().actuator_channel.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            PipelineConfig::new().with_search_radius(0.0),
            PipelineConfig::new().with_search_radius(f64::NAN),
            PipelineConfig::new().with_heading_cone(200.0),
            PipelineConfig::new().with_poll_interval(Duration::ZERO),
            PipelineConfig::new().with_zones(ZoneThresholds::new(100.0, 50.0, 250.0)),
            PipelineConfig::new().with_sensor("  ", 9600),
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
    }

    #[test]
    fn test_validate_rejects_oversized_intervals() {
        let just_over = MAX_INTERVAL + Duration::from_millis(1);
        let bad = [
            PipelineConfig::new().with_poll_interval(just_over),
            PipelineConfig::new().with_poll_interval(Duration::MAX),
            PipelineConfig::new().with_join_timeout(just_over),
        ];
        for config in bad {
            let err = config.validate().unwrap_err();
            assert!(err.contains("exceeds"), "unexpected message: {}", err);
        }

        let mut slow_sensor = PipelineConfig::new();
        slow_sensor.sensor_retry_pause = just_over;
        assert!(slow_sensor.validate().is_err());

        assert!(PipelineConfig::new()
            .with_poll_interval(MAX_INTERVAL)
            .validate()
            .is_ok());
    }
}

//! INI parsing: maps section keys onto [`PipelineConfig`] fields.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::file::{ConfigFile, ConfigFileError};
use crate::alert::ZoneThresholds;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();
    let pipeline = &mut config.pipeline;

    // [sensor] section
    if let Some(section) = ini.section(Some("sensor")) {
        if let Some(v) = non_empty(section, "channel") {
            pipeline.sensor_channel = v.to_string();
        }
        if let Some(baud) =
            parse_key::<u32>(section, "sensor", "baud", "expected a baud rate like 9600")?
        {
            pipeline.sensor_baud = positive_baud("sensor", baud)?;
        }
        if let Some(ms) =
            parse_key::<u64>(section, "sensor", "read_timeout_ms", "expected milliseconds")?
        {
            pipeline.sensor_read_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) =
            parse_key::<u64>(section, "sensor", "retry_pause_ms", "expected milliseconds")?
        {
            pipeline.sensor_retry_pause = Duration::from_millis(ms);
        }
    }

    // [dataset] section
    if let Some(section) = ini.section(Some("dataset")) {
        if let Some(v) = non_empty(section, "path") {
            pipeline.dataset_path = expand_tilde(v);
        }
    }

    // [query] section
    if let Some(section) = ini.section(Some("query")) {
        if let Some(radius) = parse_key::<f64>(section, "query", "radius_m", "expected meters")? {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(invalid("query", "radius_m", radius, "must be greater than zero"));
            }
            pipeline.search_radius_m = radius;
        }
        if let Some(cone) = parse_key::<f64>(section, "query", "cone_deg", "expected degrees")? {
            if !(0.0..=180.0).contains(&cone) {
                return Err(invalid("query", "cone_deg", cone, "must be between 0 and 180"));
            }
            pipeline.heading_cone_deg = cone;
        }
        if let Some(secs) =
            parse_key::<f64>(section, "query", "interval_secs", "expected seconds like 0.5")?
        {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(invalid("query", "interval_secs", secs, "must be greater than zero"));
            }
            pipeline.poll_interval = secs_to_duration("query", "interval_secs", secs)?;
        }
        if let Some(secs) =
            parse_key::<f64>(section, "query", "passed_grace_secs", "expected seconds")?
        {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(invalid("query", "passed_grace_secs", secs, "must not be negative"));
            }
            pipeline.passed_grace = secs_to_duration("query", "passed_grace_secs", secs)?;
        }
    }

    // [actuator] section
    if let Some(section) = ini.section(Some("actuator")) {
        if let Some(v) = section.get("channel") {
            let v = v.trim();
            pipeline.actuator_channel = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(baud) =
            parse_key::<u32>(section, "actuator", "baud", "expected a baud rate like 115200")?
        {
            pipeline.actuator_baud = positive_baud("actuator", baud)?;
        }
        let protocol = &mut pipeline.actuator_protocol;
        for (key, slot) in [
            ("token_imminent", &mut protocol.imminent),
            ("token_near", &mut protocol.near),
            ("token_approaching", &mut protocol.approaching),
            ("token_far", &mut protocol.far),
            ("token_idle", &mut protocol.idle),
        ] {
            if let Some(v) = section.get(key) {
                let v = v.trim();
                if v.is_empty() || v.contains(',') || v.contains('\n') {
                    return Err(invalid("actuator", key, v, "must be non-empty without commas"));
                }
                *slot = v.to_string();
            }
        }
    }

    // [zones] section
    if let Some(section) = ini.section(Some("zones")) {
        let mut zones = pipeline.zones;
        if let Some(v) = parse_key::<f64>(section, "zones", "imminent_m", "expected meters")? {
            zones.imminent_m = v;
        }
        if let Some(v) = parse_key::<f64>(section, "zones", "near_m", "expected meters")? {
            zones.near_m = v;
        }
        if let Some(v) = parse_key::<f64>(section, "zones", "approaching_m", "expected meters")? {
            zones.approaching_m = v;
        }
        if !zones.is_valid() {
            return Err(invalid(
                "zones",
                "approaching_m",
                describe_zones(&zones),
                "thresholds must be non-negative and imminent <= near <= approaching",
            ));
        }
        pipeline.zones = zones;
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

/// Parse `key` if present. Empty values count as absent.
fn parse_key<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
    reason: &str,
) -> Result<Option<T>, ConfigFileError> {
    let Some(v) = non_empty(section, key) else {
        return Ok(None);
    };
    v.parse()
        .map(Some)
        .map_err(|_| invalid(section_name, key, v, reason))
}

fn positive_baud(section: &str, baud: u32) -> Result<u32, ConfigFileError> {
    if baud == 0 {
        return Err(invalid(section, "baud", baud, "must be greater than zero"));
    }
    Ok(baud)
}

/// Seconds to a `Duration`, rejecting values a `Duration` cannot hold.
fn secs_to_duration(section: &str, key: &str, secs: f64) -> Result<Duration, ConfigFileError> {
    Duration::try_from_secs_f64(secs).map_err(|_| invalid(section, key, secs, "too large"))
}

fn describe_zones(zones: &ZoneThresholds) -> String {
    format!("{}/{}/{}", zones.imminent_m, zones.near_m, zones.approaching_m)
}

fn invalid(section: &str, key: &str, value: impl ToString, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineConfig;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_gives_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
[sensor]
channel = tcp://127.0.0.1:10110
baud = 38400
read_timeout_ms = 100
retry_pause_ms = 2000

[dataset]
path = /var/lib/lightscout/lights.json.gz

[query]
radius_m = 800
cone_deg = 60
interval_secs = 0.25
passed_grace_secs = 3

[actuator]
channel = /dev/ttyACM0
baud = 57600
token_imminent = RED

[zones]
imminent_m = 30
near_m = 80
approaching_m = 300
"#,
        )
        .unwrap();

        let p = config.pipeline;
        assert_eq!(p.sensor_channel, "tcp://127.0.0.1:10110");
        assert_eq!(p.sensor_baud, 38400);
        assert_eq!(p.sensor_read_timeout, Duration::from_millis(100));
        assert_eq!(p.sensor_retry_pause, Duration::from_secs(2));
        assert_eq!(p.dataset_path, PathBuf::from("/var/lib/lightscout/lights.json.gz"));
        assert_eq!(p.search_radius_m, 800.0);
        assert_eq!(p.heading_cone_deg, 60.0);
        assert_eq!(p.poll_interval, Duration::from_millis(250));
        assert_eq!(p.passed_grace, Duration::from_secs(3));
        assert_eq!(p.actuator_channel.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(p.actuator_baud, 57600);
        assert_eq!(p.actuator_protocol.imminent, "RED");
        assert_eq!(p.actuator_protocol.near, "NEAR");
        assert_eq!(p.zones, ZoneThresholds::new(30.0, 80.0, 300.0));
    }

    #[test]
    fn test_empty_actuator_channel_disables_output() {
        let config = parse("[actuator]\nchannel =\n").unwrap();
        assert!(config.pipeline.actuator_channel.is_none());
    }

    #[test]
    fn test_invalid_number() {
        let err = parse("[query]\nradius_m = far\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, value, .. } => {
                assert_eq!(section, "query");
                assert_eq!(key, "radius_m");
                assert_eq!(value, "far");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(parse("[query]\nradius_m = 0\n").is_err());
        assert!(parse("[query]\ncone_deg = 200\n").is_err());
        assert!(parse("[query]\ninterval_secs = 0\n").is_err());
        assert!(parse("[query]\npassed_grace_secs = -1\n").is_err());
        assert!(parse("[sensor]\nbaud = 0\n").is_err());
        assert!(parse("[actuator]\ntoken_far = A,B\n").is_err());
    }

    #[test]
    fn test_rejects_durations_too_large_to_represent() {
        for key in ["interval_secs", "passed_grace_secs"] {
            let err = parse(&format!("[query]\n{} = 1e30\n", key)).unwrap_err();
            match err {
                ConfigFileError::InvalidValue {
                    section,
                    key: bad_key,
                    reason,
                    ..
                } => {
                    assert_eq!(section, "query");
                    assert_eq!(bad_key, key);
                    assert_eq!(reason, "too large");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_rejects_unordered_zones() {
        let err = parse("[zones]\nnear_m = 300\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::InvalidValue { ref section, .. } if section == "zones"
        ));
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/lights.json"), home.join("lights.json"));
        }
    }
}

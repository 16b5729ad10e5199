//! Configuration file support for `~/.lightscout/config.ini`.
//!
//! ```ini
//! [sensor]
//! channel = /dev/ttyUSB0
//! baud = 9600
//!
//! [dataset]
//! path = ~/.lightscout/traffic_lights.json.gz
//!
//! [query]
//! radius_m = 500
//! cone_deg = 90
//! interval_secs = 0.5
//!
//! [actuator]
//! channel = /dev/ttyACM0
//! baud = 115200
//!
//! [zones]
//! imminent_m = 50
//! near_m = 100
//! approaching_m = 250
//! ```

mod file;
mod parser;

use std::path::PathBuf;

pub use file::{ConfigFile, ConfigFileError};

/// Directory holding the configuration file.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lightscout")
}

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.ini")
}

//! Configuration file loading.

use std::path::Path;

use ini::Ini;
use thiserror::Error;

use crate::pipeline::PipelineConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the INI file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Settings loaded from a configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub pipeline: PipelineConfig,
}

impl ConfigFile {
    /// Load configuration from `path`.
    ///
    /// A missing file yields the defaults. Keys not present keep their
    /// default values; unknown keys are ignored.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        let config = super::parser::parse_ini(&ini)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Load from `~/.lightscout/config.ini`.
    pub fn load_default() -> Result<Self, ConfigFileError> {
        Self::load(&super::default_config_path())
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content)
            .map_err(|e| ConfigFileError::ReadError(ini::Error::Parse(e)))?;
        super::parser::parse_ini(&ini)
    }

    pub fn into_pipeline_config(self) -> PipelineConfig {
        self.pipeline
    }
}

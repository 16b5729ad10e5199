//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use lightscout::channel::ChannelError;
use lightscout::config::ConfigFileError;
use lightscout::index::IndexError;
use lightscout::pipeline::PipelineError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to load or query the dataset
    Index(IndexError),
    /// Pipeline failed to start
    Pipeline(PipelineError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Pipeline(PipelineError::Channel(ChannelError::Unavailable { .. })) = self {
            eprintln!();
            eprintln!("Common issues:");
            eprintln!("  1. Device not connected: check `ls /dev/ttyUSB* /dev/ttyACM*`");
            eprintln!("  2. Permissions: add your user to the 'dialout' group");
            eprintln!("  3. Port in use: stop gpsd or any other reader of the device");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Index(e) => write!(f, "Dataset error: {}", e),
            CliError::Pipeline(e) => write!(f, "Failed to start pipeline: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Index(e) => Some(e),
            CliError::Pipeline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IndexError> for CliError {
    fn from(e: IndexError) -> Self {
        CliError::Index(e)
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

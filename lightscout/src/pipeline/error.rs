//! Pipeline errors.

use crate::channel::ChannelError;
use crate::index::IndexError;

/// Result type for pipeline lifecycle operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors returned by [`ProximityPipeline::start`](super::ProximityPipeline::start).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("pipeline is already running")]
    AlreadyRunning,

    #[error("pipeline has been stopped and cannot be restarted")]
    AlreadyStopped,

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load traffic light index: {0}")]
    Index(#[from] IndexError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Error returned by a user callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

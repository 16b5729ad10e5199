//! Error types for the spatial index.

use std::path::PathBuf;

/// Result type for spatial index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors raised while loading or querying the spatial index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Query input out of range. Raised before any work is done.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Dataset file does not exist.
    #[error("dataset not found at: {0}")]
    NotFound(PathBuf),

    /// Dataset exists but does not have the expected structure.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// Dataset could not be read.
    #[error("IO error reading dataset: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_dataset(msg: impl Into<String>) -> Self {
        Self::InvalidDataset(msg.into())
    }

    /// Whether the caller can recover by correcting its input.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

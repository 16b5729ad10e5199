//! Channel errors.

use std::io;

/// Errors raised while opening a sensor or actuator channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The identifier does not name a supported channel.
    #[error("invalid channel identifier '{0}'")]
    InvalidIdentifier(String),

    /// The channel exists but could not be opened.
    #[error("channel {channel} unavailable: {source}")]
    Unavailable {
        channel: String,
        #[source]
        source: io::Error,
    },
}

impl ChannelError {
    pub(crate) fn unavailable(channel: impl Into<String>, source: impl Into<io::Error>) -> Self {
        Self::Unavailable {
            channel: channel.into(),
            source: source.into(),
        }
    }
}

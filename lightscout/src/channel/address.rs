//! Channel identifier parsing.

use std::fmt;
use std::path::PathBuf;

use super::ChannelError;

const TCP_SCHEME: &str = "tcp://";
const FILE_SCHEME: &str = "file://";

/// Where a channel lives.
///
/// | Identifier | Channel |
/// |------------|---------|
/// | `tcp://host:port` | TCP stream (gpsd raw, phone relay) |
/// | `file:///path/to/log.nmea` | recorded NMEA replay (sensor only) |
/// | anything else | serial device path |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAddress {
    Serial(String),
    Tcp(String),
    File(PathBuf),
}

impl ChannelAddress {
    pub fn parse(identifier: &str) -> Result<Self, ChannelError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ChannelError::InvalidIdentifier(identifier.to_string()));
        }

        if let Some(addr) = identifier.strip_prefix(TCP_SCHEME) {
            // host:port with a non-empty host and numeric port
            match addr.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                    Ok(Self::Tcp(addr.to_string()))
                }
                _ => Err(ChannelError::InvalidIdentifier(identifier.to_string())),
            }
        } else if let Some(path) = identifier.strip_prefix(FILE_SCHEME) {
            if path.is_empty() {
                return Err(ChannelError::InvalidIdentifier(identifier.to_string()));
            }
            Ok(Self::File(PathBuf::from(path)))
        } else if identifier.contains("://") {
            Err(ChannelError::InvalidIdentifier(identifier.to_string()))
        } else {
            Ok(Self::Serial(identifier.to_string()))
        }
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial(path) => write!(f, "{}", path),
            Self::Tcp(addr) => write!(f, "{}{}", TCP_SCHEME, addr),
            Self::File(path) => write!(f, "{}{}", FILE_SCHEME, path.display()),
        }
    }
}

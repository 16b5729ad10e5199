//! Sensor and actuator channels.
//!
//! The pipeline talks to hardware through two small traits so the same code
//! runs against a serial GPS, a TCP relay, a recorded log, or an in-memory
//! queue in tests:
//!
//! ```text
//! ChannelProvider ──open_sensor──► SensorChannel ──read_line──► PositionTracker
//!                 └─open_actuator─► ActuatorSink  ◄─send_line── proximity poller
//! ```

mod address;
mod device;
mod error;
mod line;
mod memory;

use std::io;
use std::time::Duration;

pub use address::ChannelAddress;
pub use device::{DeviceChannels, DEFAULT_ACTUATOR_SETTLE};
pub use error::ChannelError;
pub use memory::{ActuatorLog, MemoryChannels, SensorFeed};

pub(crate) use line::is_timeout;

/// Line-oriented input from a position sensor.
pub trait SensorChannel: Send {
    /// Read the next line without its trailing newline.
    ///
    /// Returns `Ok(None)` when no complete line arrived within the read
    /// timeout. Errors are transport failures; callers may retry.
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Identifier used in log messages.
    fn name(&self) -> &str;
}

/// Line-oriented output to the alert actuator.
pub trait ActuatorSink: Send {
    /// Write `line` followed by a newline and flush.
    fn send_line(&mut self, line: &str) -> io::Result<()>;

    fn name(&self) -> &str;
}

/// Opens channels from configuration identifiers.
pub trait ChannelProvider: Send + Sync {
    fn open_sensor(
        &self,
        identifier: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SensorChannel>, ChannelError>;

    fn open_actuator(
        &self,
        identifier: &str,
        baud_rate: u32,
    ) -> Result<Box<dyn ActuatorSink>, ChannelError>;
}

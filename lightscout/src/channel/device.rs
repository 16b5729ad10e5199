//! Serial, TCP and file backed channels.

use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use super::address::ChannelAddress;
use super::line::{LineRead, LineReader};
use super::{ActuatorSink, ChannelError, ChannelProvider, SensorChannel};

/// Delay after opening a serial actuator. Boards like the Arduino Uno reset
/// when the port opens and drop bytes until the bootloader exits.
pub const DEFAULT_ACTUATOR_SETTLE: Duration = Duration::from_secs(2);

/// Upper bound on a single TCP connect attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens real devices named by [`ChannelAddress`] identifiers.
#[derive(Debug, Clone)]
pub struct DeviceChannels {
    actuator_settle: Duration,
}

impl Default for DeviceChannels {
    fn default() -> Self {
        Self {
            actuator_settle: DEFAULT_ACTUATOR_SETTLE,
        }
    }
}

impl DeviceChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the post-open delay for serial actuators.
    pub fn with_actuator_settle(mut self, settle: Duration) -> Self {
        self.actuator_settle = settle;
        self
    }
}

impl ChannelProvider for DeviceChannels {
    fn open_sensor(
        &self,
        identifier: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SensorChannel>, ChannelError> {
        let address = ChannelAddress::parse(identifier)?;
        let name = address.to_string();
        // Zero disables the timeout on sockets; keep reads bounded
        let read_timeout = read_timeout.max(Duration::from_millis(1));

        let (source, on_eof): (Box<dyn Read + Send>, EofPolicy) = match &address {
            ChannelAddress::Serial(path) => {
                let port = serialport::new(path.as_str(), baud_rate)
                    .timeout(read_timeout)
                    .open()
                    .map_err(|e| ChannelError::unavailable(&name, e))?;
                (Box::new(port), EofPolicy::Idle)
            }
            ChannelAddress::Tcp(addr) => {
                let stream = connect_tcp(addr, Some(read_timeout))
                    .map_err(|e| ChannelError::unavailable(&name, e))?;
                (Box::new(stream), EofPolicy::Reconnect(addr.clone()))
            }
            ChannelAddress::File(path) => {
                let file = File::open(path).map_err(|e| ChannelError::unavailable(&name, e))?;
                (Box::new(file), EofPolicy::Wait)
            }
        };

        info!(channel = %name, baud_rate, "Opened sensor channel");

        Ok(Box::new(StreamSensor {
            name,
            reader: LineReader::new(source),
            on_eof,
            read_timeout,
        }))
    }

    fn open_actuator(
        &self,
        identifier: &str,
        baud_rate: u32,
    ) -> Result<Box<dyn ActuatorSink>, ChannelError> {
        let address = ChannelAddress::parse(identifier)?;
        let name = address.to_string();

        let sink: Box<dyn Write + Send> = match &address {
            ChannelAddress::Serial(path) => {
                let port = serialport::new(path.as_str(), baud_rate)
                    .timeout(Duration::from_secs(1))
                    .open()
                    .map_err(|e| ChannelError::unavailable(&name, e))?;
                if !self.actuator_settle.is_zero() {
                    debug!(
                        channel = %name,
                        settle_ms = self.actuator_settle.as_millis() as u64,
                        "Waiting for actuator reset"
                    );
                    thread::sleep(self.actuator_settle);
                }
                Box::new(port)
            }
            ChannelAddress::Tcp(addr) => {
                let stream =
                    connect_tcp(addr, None).map_err(|e| ChannelError::unavailable(&name, e))?;
                Box::new(stream)
            }
            ChannelAddress::File(_) => {
                return Err(ChannelError::InvalidIdentifier(identifier.to_string()));
            }
        };

        info!(channel = %name, baud_rate, "Opened actuator channel");

        Ok(Box::new(StreamActuator { name, sink }))
    }
}

/// Connect to `addr`, trying each resolved address in turn.
fn connect_tcp(addr: &str, read_timeout: Option<Duration>) -> io::Result<TcpStream> {
    let mut last_err = None;
    for socket_addr in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&socket_addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                stream.set_read_timeout(read_timeout)?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("{} resolved to no address", addr))
    }))
}

/// What a sensor does when its stream runs dry.
#[derive(Debug, Clone)]
enum EofPolicy {
    /// Serial ports report no data as an empty read.
    Idle,
    /// The relay closed the socket; dial `host:port` again.
    Reconnect(String),
    /// Replay finished; idle for one read timeout.
    Wait,
}

struct StreamSensor {
    name: String,
    reader: LineReader<Box<dyn Read + Send>>,
    on_eof: EofPolicy,
    read_timeout: Duration,
}

impl SensorChannel for StreamSensor {
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self.reader.read_line()? {
            LineRead::Line(line) => Ok(Some(line)),
            LineRead::Idle => Ok(None),
            LineRead::Eof => match &self.on_eof {
                EofPolicy::Idle => Ok(None),
                EofPolicy::Reconnect(addr) => {
                    // NotConnected is not a timeout, so the reader backs off between attempts
                    let stream = connect_tcp(addr, Some(self.read_timeout)).map_err(|e| {
                        io::Error::new(
                            io::ErrorKind::NotConnected,
                            format!("{} closed the connection, reconnect failed: {}", self.name, e),
                        )
                    })?;
                    info!(channel = %self.name, "Reconnected sensor channel");
                    self.reader = LineReader::new(Box::new(stream));
                    Ok(None)
                }
                EofPolicy::Wait => {
                    thread::sleep(self.read_timeout);
                    Ok(None)
                }
            },
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct StreamActuator {
    name: String,
    sink: Box<dyn Write + Send>,
}

impl ActuatorSink for StreamActuator {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.sink.write_all(line.as_bytes())?;
        self.sink.write_all(b"\n")?;
        self.sink.flush()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

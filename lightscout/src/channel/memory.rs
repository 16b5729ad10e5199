//! In-process channels for tests and simulation.
//!
//! [`MemoryChannels`] hands out a sensor fed from a [`SensorFeed`] and an
//! actuator that records into an [`ActuatorLog`]. Both handles are cheap to
//! clone and can be used from the test thread while the pipeline runs.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::{ActuatorSink, ChannelError, ChannelProvider, SensorChannel};

const MEMORY_SENSOR_NAME: &str = "memory://sensor";
const MEMORY_ACTUATOR_NAME: &str = "memory://actuator";

/// Producer side of an in-memory sensor.
#[derive(Debug, Clone, Default)]
pub struct SensorFeed {
    queue: Arc<Mutex<VecDeque<io::Result<Vec<u8>>>>>,
}

impl SensorFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a line (without trailing newline).
    pub fn push_line(&self, line: impl AsRef<[u8]>) {
        self.queue.lock().push_back(Ok(line.as_ref().to_vec()));
    }

    /// Queue a read failure.
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.queue
            .lock()
            .push_back(Err(io::Error::new(kind, "injected sensor failure")));
    }

    /// Lines not yet consumed.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

/// Consumer side of an in-memory actuator.
#[derive(Debug, Clone, Default)]
pub struct ActuatorLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl ActuatorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

/// Channel provider backed by in-memory queues.
#[derive(Debug, Clone, Default)]
pub struct MemoryChannels {
    feed: SensorFeed,
    log: ActuatorLog,
    sensor_unavailable: bool,
    actuator_unavailable: bool,
}

impl MemoryChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self) -> SensorFeed {
        self.feed.clone()
    }

    pub fn actuator_log(&self) -> ActuatorLog {
        self.log.clone()
    }

    /// Make `open_sensor` fail, as if the device were unplugged.
    pub fn with_unavailable_sensor(mut self) -> Self {
        self.sensor_unavailable = true;
        self
    }

    /// Make `open_actuator` fail.
    pub fn with_unavailable_actuator(mut self) -> Self {
        self.actuator_unavailable = true;
        self
    }
}

impl ChannelProvider for MemoryChannels {
    fn open_sensor(
        &self,
        identifier: &str,
        _baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SensorChannel>, ChannelError> {
        if self.sensor_unavailable {
            return Err(ChannelError::unavailable(
                identifier,
                io::Error::new(io::ErrorKind::NotFound, "no such device"),
            ));
        }
        Ok(Box::new(MemorySensor {
            feed: self.feed.clone(),
            read_timeout,
        }))
    }

    fn open_actuator(
        &self,
        identifier: &str,
        _baud_rate: u32,
    ) -> Result<Box<dyn ActuatorSink>, ChannelError> {
        if self.actuator_unavailable {
            return Err(ChannelError::unavailable(
                identifier,
                io::Error::new(io::ErrorKind::NotFound, "no such device"),
            ));
        }
        Ok(Box::new(MemoryActuator { log: self.log.clone() }))
    }
}

struct MemorySensor {
    feed: SensorFeed,
    read_timeout: Duration,
}

impl SensorChannel for MemorySensor {
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let next = self.feed.queue.lock().pop_front();
        match next {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e),
            None => {
                // Behave like a device read timing out
                thread::sleep(self.read_timeout.min(Duration::from_millis(10)));
                Ok(None)
            }
        }
    }

    fn name(&self) -> &str {
        MEMORY_SENSOR_NAME
    }
}

struct MemoryActuator {
    log: ActuatorLog,
}

impl ActuatorSink for MemoryActuator {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.log.lines.lock().push(line.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        MEMORY_ACTUATOR_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_and_read() {
        let channels = MemoryChannels::new();
        let feed = channels.feed();
        let mut sensor = channels
            .open_sensor("mem", 9600, Duration::from_millis(1))
            .unwrap();

        assert_eq!(sensor.read_line().unwrap(), None);

        feed.push_line("$GPGGA");
        feed.push_error(io::ErrorKind::BrokenPipe);
        assert_eq!(feed.pending(), 2);

        assert_eq!(sensor.read_line().unwrap(), Some(b"$GPGGA".to_vec()));
        assert_eq!(sensor.read_line().unwrap_err().kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(feed.pending(), 0);
    }

    #[test]
    fn test_actuator_records_lines() {
        let channels = MemoryChannels::new();
        let log = channels.actuator_log();
        let mut actuator = channels.open_actuator("mem", 115200).unwrap();

        actuator.send_line("FAR,300,40").unwrap();
        actuator.send_line("IDLE,0,40").unwrap();
        assert_eq!(log.lines(), vec!["FAR,300,40", "IDLE,0,40"]);

        log.clear();
        assert!(log.lines().is_empty());
    }

    #[test]
    fn test_unavailable() {
        let channels = MemoryChannels::new()
            .with_unavailable_sensor()
            .with_unavailable_actuator();
        assert!(matches!(
            channels.open_sensor("/dev/ttyUSB0", 9600, Duration::from_millis(1)),
            Err(ChannelError::Unavailable { .. })
        ));
        assert!(matches!(
            channels.open_actuator("/dev/ttyACM0", 115200),
            Err(ChannelError::Unavailable { .. })
        ));
    }
}

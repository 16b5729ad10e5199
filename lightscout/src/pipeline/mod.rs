//! Proximity pipeline: live position in, proximity alerts out.
//!
//! # Architecture
//!
//! ```text
//! SensorChannel ──► position-reader ──► PositionTracker (Fix)
//!                                             │ snapshot
//!                                             ▼
//!                  SpatialIndex ◄──── proximity-poller ──► on_alert callback
//!                                             │
//!                                             └──────────► ActuatorSink
//! ```
//!
//! The pipeline moves `NotStarted → Running → Stopped`. Stopped is terminal;
//! build a new pipeline to run again.
//!
//! # Example
//!
//! ```ignore
//! use lightscout::pipeline::{PipelineConfig, ProximityPipeline};
//!
//! let config = PipelineConfig::new()
//!     .with_dataset("data/traffic_lights.json")
//!     .with_sensor("/dev/ttyUSB0", 9600);
//!
//! let pipeline = ProximityPipeline::builder(config)
//!     .on_alert(|alert| {
//!         println!("{} at {:.0} m", alert.zone, alert.distance_m);
//!         Ok(())
//!     })
//!     .build();
//!
//! pipeline.start()?;
//! // ...
//! pipeline.stop();
//! ```

mod callback;
mod config;
mod error;
mod poller;
mod shutdown;
mod stats;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::alert::{ActuatorProtocol, Alert};
use crate::channel::{ChannelProvider, DeviceChannels};
use crate::index::{NearbyLight, SpatialIndex};
use crate::position::{Fix, PositionTracker, TrackerCounters};

use poller::{PollSettings, Poller, SharedActuator, SharedResults};

pub use callback::{AlertCallback, PositionCallback};
pub use config::{
    PipelineConfig, DEFAULT_ACTUATOR_BAUD, DEFAULT_DATASET_PATH, DEFAULT_JOIN_TIMEOUT,
    DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT, DEFAULT_SEARCH_RADIUS_M, DEFAULT_SENSOR_BAUD,
    DEFAULT_SENSOR_CHANNEL, MAX_INTERVAL,
};
pub use error::{CallbackError, PipelineError, PipelineResult};
pub use shutdown::ShutdownSignal;
pub use stats::{PipelineStats, PipelineStatus};

/// Name of the sensor reader thread.
pub const READER_THREAD: &str = "position-reader";
/// Name of the proximity poller thread.
pub const POLLER_THREAD: &str = "proximity-poller";

/// Lifecycle state of a [`ProximityPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Running,
    Stopped,
}

/// Configures callbacks and channels before building a pipeline.
pub struct PipelineBuilder {
    config: PipelineConfig,
    channels: Option<Arc<dyn ChannelProvider>>,
    on_position: Option<PositionCallback>,
    on_alert: Option<AlertCallback>,
}

impl PipelineBuilder {
    /// Channel provider used to open the sensor and actuator.
    ///
    /// Defaults to [`DeviceChannels`].
    pub fn channels(mut self, provider: impl ChannelProvider + 'static) -> Self {
        self.channels = Some(Arc::new(provider));
        self
    }

    /// Callback invoked on the reader thread for every new fix.
    pub fn on_position<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Fix) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.on_position = Some(Arc::new(callback));
        self
    }

    /// Callback invoked on the poller thread for every alert.
    pub fn on_alert<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Alert) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.on_alert = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> ProximityPipeline {
        let channels: Arc<dyn ChannelProvider> = match self.channels {
            Some(channels) => channels,
            None => Arc::new(DeviceChannels::new()),
        };
        ProximityPipeline {
            config: self.config,
            channels,
            on_position: self.on_position,
            on_alert: self.on_alert,
            start_lock: Mutex::new(()),
            inner: Mutex::new(Inner {
                state: PipelineState::NotStarted,
                runtime: None,
            }),
        }
    }
}

/// Resources owned while the pipeline runs.
struct Runtime {
    shutdown: Arc<ShutdownSignal>,
    tracker: Arc<PositionTracker>,
    results: Arc<SharedResults>,
    actuator: SharedActuator,
    reader: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
}

struct Inner {
    state: PipelineState,
    runtime: Option<Runtime>,
}

/// Tracks position and raises proximity alerts on two background threads.
///
/// All methods take `&self`; the pipeline can be shared across threads
/// (for example with a Ctrl-C handler) behind an `Arc`. Dropping a running
/// pipeline stops it.
pub struct ProximityPipeline {
    config: PipelineConfig,
    channels: Arc<dyn ChannelProvider>,
    on_position: Option<PositionCallback>,
    on_alert: Option<AlertCallback>,
    /// Held for the whole of `start`. `inner` is only locked briefly.
    start_lock: Mutex<()>,
    inner: Mutex<Inner>,
}

impl ProximityPipeline {
    pub fn builder(config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder {
            config,
            channels: None,
            on_position: None,
            on_alert: None,
        }
    }

    /// Pipeline on real devices with no callbacks.
    pub fn new(config: PipelineConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the dataset, open channels and start both threads.
    ///
    /// On failure everything acquired so far is released and the pipeline
    /// stays `NotStarted`. State and accessors stay responsive while the
    /// dataset loads and channels open. A `stop` issued meanwhile wins: the
    /// fresh threads are shut down and `AlreadyStopped` is returned.
    pub fn start(&self) -> PipelineResult<()> {
        let _starting = self.start_lock.lock();
        Self::check_startable(self.inner.lock().state)?;

        let runtime = self.launch()?;

        let mut inner = self.inner.lock();
        if let Err(e) = Self::check_startable(inner.state) {
            drop(inner);
            debug!("Pipeline stopped while starting");
            self.release(runtime);
            return Err(e);
        }
        inner.runtime = Some(runtime);
        inner.state = PipelineState::Running;

        info!("Proximity pipeline started");
        Ok(())
    }

    fn check_startable(state: PipelineState) -> PipelineResult<()> {
        match state {
            PipelineState::Running => Err(PipelineError::AlreadyRunning),
            PipelineState::Stopped => Err(PipelineError::AlreadyStopped),
            PipelineState::NotStarted => Ok(()),
        }
    }

    /// Acquire the dataset and channels and spawn both workers.
    fn launch(&self) -> PipelineResult<Runtime> {
        let config = &self.config;
        config.validate().map_err(PipelineError::InvalidConfig)?;

        info!(
            dataset = %config.dataset_path.display(),
            sensor = %config.sensor_channel,
            actuator = config.actuator_channel.as_deref().unwrap_or("none"),
            "Starting proximity pipeline"
        );

        let index = Arc::new(SpatialIndex::open(&config.dataset_path)?);
        let mut sensor = self.channels.open_sensor(
            &config.sensor_channel,
            config.sensor_baud,
            config.sensor_read_timeout,
        )?;
        let actuator = match &config.actuator_channel {
            Some(identifier) => {
                Some(self.channels.open_actuator(identifier, config.actuator_baud)?)
            }
            None => {
                debug!("No actuator configured, alerts go to callbacks only");
                None
            }
        };

        let shutdown = Arc::new(ShutdownSignal::new());
        let tracker = Arc::new(PositionTracker::new().with_retry_pause(config.sensor_retry_pause));
        let results = Arc::new(SharedResults::default());
        let actuator: SharedActuator = Arc::new(Mutex::new(actuator));

        let reader = {
            let tracker = Arc::clone(&tracker);
            let shutdown = Arc::clone(&shutdown);
            let on_position = self.on_position.clone();
            thread::Builder::new()
                .name(READER_THREAD.to_string())
                .spawn(move || {
                    tracker.run(sensor.as_mut(), &shutdown, |fix| {
                        if let Some(notify) = &on_position {
                            callback::invoke("position", notify.as_ref(), fix);
                        }
                    });
                })
                .map_err(|source| PipelineError::ThreadSpawn {
                    name: READER_THREAD,
                    source,
                })?
        };

        let poller = Poller {
            index,
            tracker: Arc::clone(&tracker),
            results: Arc::clone(&results),
            shutdown: Arc::clone(&shutdown),
            actuator: Arc::clone(&actuator),
            on_alert: self.on_alert.clone(),
            settings: PollSettings {
                interval: config.poll_interval,
                radius_m: config.search_radius_m,
                cone_deg: config.heading_cone_deg,
                zones: config.zones,
                protocol: config.actuator_protocol.clone(),
                passed_grace: config.passed_grace,
            },
        };
        let poller = match thread::Builder::new()
            .name(POLLER_THREAD.to_string())
            .spawn(move || poller.run())
        {
            Ok(handle) => handle,
            Err(source) => {
                shutdown.trigger();
                join_with_timeout(READER_THREAD, reader, config.join_timeout);
                return Err(PipelineError::ThreadSpawn {
                    name: POLLER_THREAD,
                    source,
                });
            }
        };

        Ok(Runtime {
            shutdown,
            tracker,
            results,
            actuator,
            reader: Some(reader),
            poller: Some(poller),
        })
    }

    /// Stop both threads and release the channels.
    ///
    /// Safe to call any number of times, including before or after a failed
    /// start. The pipeline is `Stopped` afterwards.
    pub fn stop(&self) {
        let runtime = {
            let mut inner = self.inner.lock();
            if inner.state == PipelineState::Stopped {
                return;
            }
            inner.state = PipelineState::Stopped;
            inner.runtime.take()
        };

        let Some(runtime) = runtime else {
            debug!("Pipeline stopped before it was started");
            return;
        };

        info!("Stopping proximity pipeline");
        self.release(runtime);
    }

    /// Signal both workers, join them and close the actuator.
    fn release(&self, mut runtime: Runtime) {
        runtime.shutdown.trigger();

        if let Some(handle) = runtime.reader.take() {
            join_with_timeout(READER_THREAD, handle, self.config.join_timeout);
        }
        if let Some(handle) = runtime.poller.take() {
            join_with_timeout(POLLER_THREAD, handle, self.config.join_timeout);
        }

        if let Some(actuator) = runtime.actuator.lock().take() {
            debug!(channel = actuator.name(), "Closed actuator channel");
        }

        let stats = runtime.results.metrics.snapshot();
        let counters = runtime.tracker.counters();
        info!(
            queries = stats.query_count,
            avg_query_ms = stats.avg_query_ms(),
            fixes = counters.fixes_published,
            "Proximity pipeline stopped"
        );
    }

    pub fn state(&self) -> PipelineState {
        self.inner.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == PipelineState::Running
    }

    /// Latest usable fix, if any.
    pub fn current_fix(&self) -> Option<Fix> {
        self.with_runtime(|rt| rt.tracker.current()).flatten()
    }

    /// Lights found by the last query, nearest first.
    pub fn nearby(&self) -> Vec<NearbyLight> {
        self.with_runtime(|rt| rt.results.nearby.lock().clone())
            .unwrap_or_default()
    }

    /// Nearest light from the last query.
    pub fn closest(&self) -> Option<NearbyLight> {
        self.with_runtime(|rt| rt.results.nearby.lock().first().copied())
            .flatten()
    }

    /// Whether the nearest light is within `threshold_m`.
    pub fn is_approaching(&self, threshold_m: f64) -> bool {
        self.closest()
            .is_some_and(|light| light.distance_m <= threshold_m)
    }

    /// Query statistics since start. Zero when not running.
    pub fn stats(&self) -> PipelineStats {
        self.with_runtime(|rt| rt.results.metrics.snapshot())
            .unwrap_or_default()
    }

    pub fn tracker_counters(&self) -> TrackerCounters {
        self.with_runtime(|rt| rt.tracker.counters())
            .unwrap_or_default()
    }

    pub fn status(&self) -> PipelineStatus {
        let inner = self.inner.lock();
        let runtime = inner.runtime.as_ref();
        PipelineStatus {
            state: inner.state,
            running: inner.state == PipelineState::Running,
            has_fix: runtime.is_some_and(|rt| rt.tracker.current().is_some()),
            stats: runtime
                .map(|rt| rt.results.metrics.snapshot())
                .unwrap_or_default(),
            tracker: runtime.map(|rt| rt.tracker.counters()).unwrap_or_default(),
        }
    }

    /// Write a raw `DIST,<m>` line to the actuator.
    ///
    /// Returns `false` when no actuator is open or the write failed.
    pub fn send_distance(&self, distance_m: f64) -> bool {
        let line = ActuatorProtocol::distance_line(distance_m);
        self.with_runtime(|rt| {
            let mut slot = rt.actuator.lock();
            let Some(actuator) = slot.as_mut() else {
                return false;
            };
            match actuator.send_line(&line) {
                Ok(()) => true,
                Err(e) => {
                    warn!(channel = actuator.name(), error = %e, "Actuator write failed");
                    false
                }
            }
        })
        .unwrap_or(false)
    }

    fn with_runtime<T>(&self, f: impl FnOnce(&Runtime) -> T) -> Option<T> {
        self.inner.lock().runtime.as_ref().map(f)
    }
}

impl Drop for ProximityPipeline {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}

/// Join a worker, giving up after `timeout`.
///
/// A thread that does not exit in time is detached.
fn join_with_timeout(name: &'static str, handle: JoinHandle<()>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!(
                thread = name,
                timeout_ms = timeout.as_millis() as u64,
                "Thread did not exit in time, detaching"
            );
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    if handle.join().is_err() {
        warn!(thread = name, "Thread panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ActuatorSink, ChannelError, MemoryChannels, SensorChannel};
    use crate::index::{DatasetDocument, LightRecord};

    /// Memory channels whose sensor takes a while to open.
    struct SlowChannels {
        inner: MemoryChannels,
        delay: Duration,
    }

    impl ChannelProvider for SlowChannels {
        fn open_sensor(
            &self,
            identifier: &str,
            baud_rate: u32,
            read_timeout: Duration,
        ) -> Result<Box<dyn SensorChannel>, ChannelError> {
            thread::sleep(self.delay);
            self.inner.open_sensor(identifier, baud_rate, read_timeout)
        }

        fn open_actuator(
            &self,
            identifier: &str,
            baud_rate: u32,
        ) -> Result<Box<dyn ActuatorSink>, ChannelError> {
            self.inner.open_actuator(identifier, baud_rate)
        }
    }

    fn slow_pipeline(dir: &std::path::Path) -> Arc<ProximityPipeline> {
        let dataset = dir.join("lights.json");
        let document = DatasetDocument::new(vec![LightRecord::new(1, 45.0, -75.0)]);
        std::fs::write(&dataset, serde_json::to_string(&document).unwrap()).unwrap();

        let config = PipelineConfig::new()
            .with_dataset(dataset)
            .with_sensor("mem", 9600)
            .without_actuator();
        Arc::new(
            ProximityPipeline::builder(config)
                .channels(SlowChannels {
                    inner: MemoryChannels::new(),
                    delay: Duration::from_millis(400),
                })
                .build(),
        )
    }

    #[test]
    fn test_stop_before_start() {
        let pipeline = ProximityPipeline::builder(PipelineConfig::default())
            .channels(MemoryChannels::new())
            .build();
        assert_eq!(pipeline.state(), PipelineState::NotStarted);

        pipeline.stop();
        pipeline.stop();
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert!(matches!(pipeline.start(), Err(PipelineError::AlreadyStopped)));
    }

    #[test]
    fn test_accessors_when_not_running() {
        let pipeline = ProximityPipeline::new(PipelineConfig::default());
        assert!(pipeline.current_fix().is_none());
        assert!(pipeline.nearby().is_empty());
        assert!(pipeline.closest().is_none());
        assert!(!pipeline.is_approaching(100.0));
        assert_eq!(pipeline.stats(), PipelineStats::default());
        assert!(!pipeline.send_distance(42.0));

        let status = pipeline.status();
        assert!(!status.running);
        assert!(!status.has_fix);
        assert_eq!(status.state, PipelineState::NotStarted);
    }

    #[test]
    fn test_invalid_config_rejected_before_io() {
        let config = PipelineConfig::default().with_search_radius(-1.0);
        let pipeline = ProximityPipeline::builder(config)
            .channels(MemoryChannels::new())
            .build();
        assert!(matches!(pipeline.start(), Err(PipelineError::InvalidConfig(_))));
        assert_eq!(pipeline.state(), PipelineState::NotStarted);
    }

    #[test]
    fn test_join_with_timeout_detaches_stuck_thread() {
        let handle = thread::spawn(|| thread::sleep(Duration::from_millis(500)));
        let start = Instant::now();
        join_with_timeout("stuck", handle, Duration::from_millis(20));
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_state_readable_while_channels_open() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = slow_pipeline(dir.path());

        let starter = {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || pipeline.start())
        };
        thread::sleep(Duration::from_millis(100));

        let begin = Instant::now();
        assert_eq!(pipeline.state(), PipelineState::NotStarted);
        assert_eq!(pipeline.status().stats.query_count, 0);
        assert!(begin.elapsed() < Duration::from_millis(200));

        starter.join().unwrap().unwrap();
        assert!(pipeline.is_running());
        pipeline.stop();
    }

    #[test]
    fn test_stop_during_start_wins() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = slow_pipeline(dir.path());

        let starter = {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || pipeline.start())
        };
        thread::sleep(Duration::from_millis(100));
        pipeline.stop();

        let result = starter.join().unwrap();
        assert!(matches!(result, Err(PipelineError::AlreadyStopped)));
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert!(pipeline.current_fix().is_none());
    }
}

//! Lock-free query statistics.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::position::TrackerCounters;

use super::PipelineState;

/// Sentinel for "no nearest distance yet".
const NO_DISTANCE: u64 = u64::MAX;

/// Query counters updated by the poller thread.
///
/// All operations use `Relaxed` ordering; the counters are independent.
#[derive(Debug)]
pub(crate) struct QueryMetrics {
    query_count: AtomicU64,
    /// Total query time in microseconds.
    query_time_us: AtomicU64,
    /// `f64` bits of the last nearest distance, or [`NO_DISTANCE`].
    last_nearest_bits: AtomicU64,
    nearby_count: AtomicUsize,
}

impl Default for QueryMetrics {
    fn default() -> Self {
        Self {
            query_count: AtomicU64::new(0),
            query_time_us: AtomicU64::new(0),
            last_nearest_bits: AtomicU64::new(NO_DISTANCE),
            nearby_count: AtomicUsize::new(0),
        }
    }
}

impl QueryMetrics {
    /// Record one query. Returns the new query count.
    pub fn record_query(&self, elapsed: Duration) -> u64 {
        self.query_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.query_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_results(&self, nearest_m: Option<f64>, count: usize) {
        let bits = nearest_m.map(f64::to_bits).unwrap_or(NO_DISTANCE);
        self.last_nearest_bits.store(bits, Ordering::Relaxed);
        self.nearby_count.store(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStats {
        let bits = self.last_nearest_bits.load(Ordering::Relaxed);
        PipelineStats {
            query_count: self.query_count.load(Ordering::Relaxed),
            total_query_time: Duration::from_micros(self.query_time_us.load(Ordering::Relaxed)),
            last_nearest_m: (bits != NO_DISTANCE).then(|| f64::from_bits(bits)),
            nearby_count: self.nearby_count.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the query statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub query_count: u64,
    pub total_query_time: Duration,
    /// Distance to the nearest light at the last query.
    pub last_nearest_m: Option<f64>,
    /// Number of lights returned by the last query.
    pub nearby_count: usize,
}

impl PipelineStats {
    /// Average query time in milliseconds.
    pub fn avg_query_ms(&self) -> f64 {
        if self.query_count == 0 {
            return 0.0;
        }
        self.total_query_time.as_secs_f64() * 1000.0 / self.query_count as f64
    }
}

/// Summary returned by [`ProximityPipeline::status`](super::ProximityPipeline::status).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub running: bool,
    pub has_fix: bool,
    pub stats: PipelineStats,
    pub tracker: TrackerCounters,
}

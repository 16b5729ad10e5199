//! Proximity poller thread.
//!
//! Each tick snapshots the current fix, queries the index, stores the result
//! and dispatches an alert for the nearest light ahead.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::alert::{ActuatorProtocol, Alert, Zone, ZoneThresholds};
use crate::channel::ActuatorSink;
use crate::geo::distance_m;
use crate::index::{NearbyLight, SpatialIndex};
use crate::position::{Fix, PositionTracker};

use super::callback::{self, AlertCallback};
use super::shutdown::ShutdownSignal;
use super::stats::QueryMetrics;

/// Log query statistics every this many queries.
const STATS_LOG_EVERY: u64 = 100;

/// Actuator slot shared between the poller and the pipeline.
pub(crate) type SharedActuator = Arc<Mutex<Option<Box<dyn ActuatorSink>>>>;

/// State shared between the poller and pipeline accessors.
#[derive(Debug, Default)]
pub(crate) struct SharedResults {
    pub nearby: Mutex<Vec<NearbyLight>>,
    pub metrics: QueryMetrics,
}

#[derive(Debug, Clone)]
pub(crate) struct PollSettings {
    pub interval: Duration,
    pub radius_m: f64,
    pub cone_deg: f64,
    pub zones: ZoneThresholds,
    pub protocol: ActuatorProtocol,
    pub passed_grace: Duration,
}

pub(crate) struct Poller {
    pub index: Arc<SpatialIndex>,
    pub tracker: Arc<PositionTracker>,
    pub results: Arc<SharedResults>,
    pub shutdown: Arc<ShutdownSignal>,
    pub actuator: SharedActuator,
    pub on_alert: Option<AlertCallback>,
    pub settings: PollSettings,
}

/// Per-thread poller state carried between ticks.
#[derive(Debug, Default)]
struct TickState {
    had_results: bool,
    last_zone: Option<Zone>,
    passed: PassedLights,
}

impl Poller {
    pub fn run(self) {
        info!(
            interval_ms = self.settings.interval.as_millis() as u64,
            radius_m = self.settings.radius_m,
            cone_deg = self.settings.cone_deg,
            "Proximity poller started"
        );

        let mut state = TickState {
            passed: PassedLights::new(self.settings.passed_grace),
            ..Default::default()
        };

        while !self.shutdown.is_triggered() {
            self.tick(&mut state);
            if self.shutdown.wait(self.settings.interval) {
                break;
            }
        }

        info!("Proximity poller stopped");
    }

    fn tick(&self, state: &mut TickState) {
        let Some(fix) = self.tracker.current() else {
            return;
        };

        let started = Instant::now();
        let result = self.index.query(
            fix.latitude,
            fix.longitude,
            self.settings.radius_m,
            fix.heading_deg,
            self.settings.cone_deg,
        );
        let elapsed = started.elapsed();

        let lights = match result {
            Ok(lights) => lights,
            Err(e) => {
                warn!(
                    error = %e,
                    lat = fix.latitude,
                    lon = fix.longitude,
                    "Proximity query failed"
                );
                return;
            }
        };

        let query_count = self.results.metrics.record_query(elapsed);
        let lights = state
            .passed
            .apply(lights, &fix, &self.index, self.settings.radius_m, Instant::now());

        self.results
            .metrics
            .record_results(lights.first().map(|l| l.distance_m), lights.len());
        *self.results.nearby.lock() = lights.clone();

        if query_count % STATS_LOG_EVERY == 0 {
            let stats = self.results.metrics.snapshot();
            debug!(
                queries = stats.query_count,
                avg_ms = stats.avg_query_ms(),
                found = lights.len(),
                "Query stats"
            );
        }

        match lights.first() {
            Some(nearest) => {
                let alert = Alert::for_light(nearest, &self.settings.zones);
                if state.last_zone != Some(alert.zone) {
                    debug!(
                        light_id = alert.light_id,
                        zone = %alert.zone,
                        distance_m = alert.distance_m,
                        "Zone changed"
                    );
                    state.last_zone = Some(alert.zone);
                }
                self.dispatch(&alert, &fix);
                state.had_results = true;
            }
            None if state.had_results => {
                let line = self.settings.protocol.idle_line(fix.speed_kmh());
                self.send(&line);
                state.had_results = false;
                state.last_zone = None;
            }
            None => {}
        }
    }

    fn dispatch(&self, alert: &Alert, fix: &Fix) {
        if let Some(on_alert) = &self.on_alert {
            callback::invoke("alert", on_alert.as_ref(), alert);
        }
        let line = self
            .settings
            .protocol
            .alert_line(alert.zone, alert.distance_m, fix.speed_kmh());
        self.send(&line);
    }

    fn send(&self, line: &str) {
        let mut slot = self.actuator.lock();
        if let Some(actuator) = slot.as_mut() {
            if let Err(e) = actuator.send_line(line) {
                warn!(channel = actuator.name(), error = %e, "Actuator write failed");
            }
        }
    }
}

/// Keeps lights that left the heading cone in the results for a grace period.
#[derive(Debug, Default)]
struct PassedLights {
    grace: Duration,
    /// Last time each light was returned by the cone query.
    last_ahead: HashMap<i64, Instant>,
}

impl PassedLights {
    fn new(grace: Duration) -> Self {
        Self {
            grace,
            last_ahead: HashMap::new(),
        }
    }

    fn apply(
        &mut self,
        mut lights: Vec<NearbyLight>,
        fix: &Fix,
        index: &SpatialIndex,
        radius_m: f64,
        now: Instant,
    ) -> Vec<NearbyLight> {
        if self.grace.is_zero() {
            return lights;
        }

        for light in &lights {
            self.last_ahead.insert(light.id, now);
        }
        let grace = self.grace;
        self.last_ahead
            .retain(|_, seen| now.saturating_duration_since(*seen) <= grace);

        let present: HashSet<i64> = lights.iter().map(|l| l.id).collect();
        let mut retained: Vec<NearbyLight> = self
            .last_ahead
            .keys()
            .filter(|id| !present.contains(*id))
            .filter_map(|id| index.by_id(*id))
            .filter_map(|record| {
                let d = distance_m(fix.latitude, fix.longitude, record.lat, record.lon);
                (d <= radius_m).then(|| NearbyLight::from_record(&record, d))
            })
            .collect();

        if retained.is_empty() {
            return lights;
        }
        retained.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m).then(a.id.cmp(&b.id)));
        lights.extend(retained);
        lights.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        lights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::LightRecord;
    use chrono::Utc;

    fn fix_at(lat: f64, lon: f64, heading: Option<f64>) -> Fix {
        Fix {
            latitude: lat,
            longitude: lon,
            altitude: None,
            speed_mps: Some(10.0),
            heading_deg: heading,
            satellite_count: 8,
            fix_quality: 1,
            timestamp: Utc::now(),
        }
    }

    fn index() -> SpatialIndex {
        SpatialIndex::from_records(vec![LightRecord::new(1, 45.0, -75.0)]).unwrap()
    }

    #[test]
    fn test_grace_disabled_passes_through() {
        let index = index();
        let mut passed = PassedLights::new(Duration::ZERO);
        let now = Instant::now();

        let ahead = index.query(44.999, -75.0, 500.0, Some(0.0), 90.0).unwrap();
        let fix = fix_at(44.999, -75.0, Some(0.0));
        assert_eq!(passed.apply(ahead, &fix, &index, 500.0, now).len(), 1);

        // Just past the light, heading north: cone query is empty
        let behind = index.query(45.0005, -75.0, 500.0, Some(0.0), 90.0).unwrap();
        assert!(behind.is_empty());
        let out = passed.apply(behind, &fix_at(45.0005, -75.0, Some(0.0)), &index, 500.0, now);
        assert!(out.is_empty());
    }

    #[test]
    fn test_grace_retains_passed_light() {
        let index = index();
        let mut passed = PassedLights::new(Duration::from_secs(3));
        let t0 = Instant::now();

        let ahead = index.query(44.999, -75.0, 500.0, Some(0.0), 90.0).unwrap();
        passed.apply(ahead, &fix_at(44.999, -75.0, Some(0.0)), &index, 500.0, t0);

        let fix = fix_at(45.0005, -75.0, Some(0.0));
        let out = passed.apply(Vec::new(), &fix, &index, 500.0, t0 + Duration::from_secs(1));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 1);
        assert!((out[0].distance_m - 55.6).abs() < 1.0);

        // Grace expired
        let out = passed.apply(Vec::new(), &fix, &index, 500.0, t0 + Duration::from_secs(4));
        assert!(out.is_empty());
    }

    #[test]
    fn test_grace_drops_light_outside_radius() {
        let index = index();
        let mut passed = PassedLights::new(Duration::from_secs(30));
        let t0 = Instant::now();

        let ahead = index.query(44.999, -75.0, 500.0, Some(0.0), 90.0).unwrap();
        passed.apply(ahead, &fix_at(44.999, -75.0, Some(0.0)), &index, 500.0, t0);

        // ~1.1 km past the light
        let fix = fix_at(45.01, -75.0, Some(0.0));
        let out = passed.apply(Vec::new(), &fix, &index, 500.0, t0 + Duration::from_secs(1));
        assert!(out.is_empty());
    }
}

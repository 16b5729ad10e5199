//! Live position state fed from an NMEA stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use crate::channel::{is_timeout, SensorChannel};
use crate::geo::normalize_heading;
use crate::pipeline::ShutdownSignal;

use super::fix::Fix;
use super::nmea::{parse_sentence, GgaFrame, NmeaError, Sentence, VtgFrame};

/// Pause after a sensor read error before trying again.
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Why a well-formed sentence had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredFrame {
    /// GGA with quality 0 or without coordinates.
    NoFix,
    /// VTG before any position fix.
    NoPriorFix,
}

/// What happened to a single input line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Blank after decoding and trimming.
    Empty,
    /// Not a decodable sentence.
    Rejected(NmeaError),
    /// Decoded but not applied.
    Ignored(IgnoredFrame),
    /// A new fix was published.
    Published(Fix),
    /// Speed or heading of the current fix changed.
    Updated(Fix),
}

/// Point-in-time copy of the tracker counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerCounters {
    pub lines_read: u64,
    pub sentences_parsed: u64,
    pub fixes_published: u64,
    /// Lines rejected or ignored.
    pub lines_dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    lines_read: AtomicU64,
    sentences_parsed: AtomicU64,
    fixes_published: AtomicU64,
    lines_dropped: AtomicU64,
}

/// Tracks the most recent usable fix.
///
/// The reader thread calls [`handle_line`](Self::handle_line) (usually via
/// [`run`](Self::run)); any thread may read [`current`](Self::current). The
/// fix lock is only held to copy a `Fix` in or out.
#[derive(Debug)]
pub struct PositionTracker {
    fix: RwLock<Option<Fix>>,
    counters: Counters,
    retry_pause: Duration,
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionTracker {
    pub fn new() -> Self {
        Self {
            fix: RwLock::new(None),
            counters: Counters::default(),
            retry_pause: DEFAULT_RETRY_PAUSE,
        }
    }

    /// Set the pause between retries after a read error.
    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    /// Copy of the last published fix.
    pub fn current(&self) -> Option<Fix> {
        *self.fix.read()
    }

    pub fn counters(&self) -> TrackerCounters {
        TrackerCounters {
            lines_read: self.counters.lines_read.load(Ordering::Relaxed),
            sentences_parsed: self.counters.sentences_parsed.load(Ordering::Relaxed),
            fixes_published: self.counters.fixes_published.load(Ordering::Relaxed),
            lines_dropped: self.counters.lines_dropped.load(Ordering::Relaxed),
        }
    }

    /// Decode one raw line and apply it to the current fix.
    ///
    /// Non-ASCII bytes are discarded before decoding.
    pub fn handle_line(&self, raw: &[u8]) -> LineOutcome {
        self.counters.lines_read.fetch_add(1, Ordering::Relaxed);

        let text: String = raw.iter().filter(|b| b.is_ascii()).map(|&b| b as char).collect();
        let text = text.trim();
        if text.is_empty() {
            return LineOutcome::Empty;
        }

        let sentence = match parse_sentence(text) {
            Ok(sentence) => sentence,
            Err(e) => {
                trace!(line = text, error = %e, "Dropping NMEA line");
                self.counters.lines_dropped.fetch_add(1, Ordering::Relaxed);
                return LineOutcome::Rejected(e);
            }
        };
        self.counters.sentences_parsed.fetch_add(1, Ordering::Relaxed);

        let outcome = match sentence {
            Sentence::Gga(gga) => self.apply_gga(&gga),
            Sentence::Vtg(vtg) => self.apply_vtg(&vtg),
        };

        match &outcome {
            LineOutcome::Published(_) => {
                self.counters.fixes_published.fetch_add(1, Ordering::Relaxed);
            }
            LineOutcome::Ignored(reason) => {
                trace!(?reason, "Ignoring NMEA sentence");
                self.counters.lines_dropped.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        outcome
    }

    fn apply_gga(&self, gga: &GgaFrame) -> LineOutcome {
        let (Some(latitude), Some(longitude)) = (gga.latitude, gga.longitude) else {
            return LineOutcome::Ignored(IgnoredFrame::NoFix);
        };
        if gga.fix_quality == 0 {
            return LineOutcome::Ignored(IgnoredFrame::NoFix);
        }

        let mut guard = self.fix.write();
        let (speed_mps, heading_deg) = guard
            .as_ref()
            .map(|prev| (prev.speed_mps, prev.heading_deg))
            .unwrap_or((None, None));

        let fix = Fix {
            latitude,
            longitude,
            altitude: gga.altitude,
            speed_mps,
            heading_deg,
            satellite_count: gga.satellite_count.unwrap_or(0),
            fix_quality: gga.fix_quality,
            timestamp: Utc::now(),
        };
        *guard = Some(fix);

        LineOutcome::Published(fix)
    }

    fn apply_vtg(&self, vtg: &VtgFrame) -> LineOutcome {
        let mut guard = self.fix.write();
        let Some(fix) = guard.as_mut() else {
            return LineOutcome::Ignored(IgnoredFrame::NoPriorFix);
        };

        if let Some(speed) = vtg.speed_mps() {
            fix.speed_mps = Some(speed);
        }
        if let Some(track) = vtg.true_track_deg {
            fix.heading_deg = Some(normalize_heading(track));
        }

        LineOutcome::Updated(*fix)
    }

    /// Read lines from `channel` until `shutdown` is raised.
    ///
    /// `on_fix` is called on this thread for every newly published fix.
    /// Read errors are logged and retried after the retry pause.
    pub fn run<F>(&self, channel: &mut dyn SensorChannel, shutdown: &ShutdownSignal, mut on_fix: F)
    where
        F: FnMut(&Fix),
    {
        info!(channel = channel.name(), "Position reader started");
        let mut first_fix = true;

        while !shutdown.is_triggered() {
            match channel.read_line() {
                Ok(Some(line)) => {
                    if let LineOutcome::Published(fix) = self.handle_line(&line) {
                        if first_fix {
                            info!(
                                lat = fix.latitude,
                                lon = fix.longitude,
                                satellites = fix.satellite_count,
                                "First position fix"
                            );
                            first_fix = false;
                        }
                        on_fix(&fix);
                    }
                }
                Ok(None) => {}
                Err(e) if is_timeout(&e) => {}
                Err(e) => {
                    warn!(channel = channel.name(), error = %e, "Sensor read failed, retrying");
                    if shutdown.wait(self.retry_pause) {
                        break;
                    }
                }
            }
        }

        let counters = self.counters();
        debug!(
            lines_read = counters.lines_read,
            sentences_parsed = counters.sentences_parsed,
            lines_dropped = counters.lines_dropped,
            "Position reader counters"
        );
        info!(
            fixes_published = counters.fixes_published,
            "Position reader stopped"
        );
    }
}

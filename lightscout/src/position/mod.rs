//! GPS position tracking.
//!
//! [`PositionTracker`] consumes NMEA 0183 lines from a
//! [`SensorChannel`](crate::channel::SensorChannel) and maintains the latest
//! usable [`Fix`]. Position (GGA) and velocity (VTG) arrive in separate
//! sentences and are merged:
//!
//! - GGA with a valid fix publishes a new `Fix`, carrying speed and heading
//!   forward from the previous one
//! - VTG updates speed and heading of the current `Fix` in place
//! - GGA with fix quality 0 is ignored
//!
//! # Example
//!
//! ```ignore
//! use lightscout::position::PositionTracker;
//!
//! let tracker = PositionTracker::new();
//! tracker.handle_line(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47");
//! let fix = tracker.current().unwrap();
//! ```

mod fix;
pub mod nmea;
mod tracker;

pub use fix::Fix;
pub use nmea::{NmeaError, Sentence};
pub use tracker::{
    IgnoredFrame, LineOutcome, PositionTracker, TrackerCounters, DEFAULT_RETRY_PAUSE,
};

//! LightScout - forward-looking traffic light proximity alerts
//!
//! This library turns a live NMEA position feed into proximity alerts for the
//! traffic lights ahead of a moving vehicle:
//!
//! - [`geo`]: great-circle distance, bearings and bounding boxes
//! - [`index`]: static traffic light dataset with radius and heading-cone queries
//! - [`position`]: NMEA 0183 decoding and the latest-fix tracker
//! - [`alert`]: distance zones and the actuator line protocol
//! - [`channel`]: serial, TCP, file and in-memory transports
//! - [`pipeline`]: the background reader and poller tying it all together

pub mod alert;
pub mod channel;
pub mod config;
pub mod geo;
pub mod index;
pub mod logging;
pub mod pipeline;
pub mod position;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! CLI command implementations.
//!
//! - [`run`] - Live proximity alerts from a GPS receiver
//! - [`query`] - One-shot dataset query
//! - [`info`] - Dataset statistics

pub mod info;
pub mod query;
pub mod run;

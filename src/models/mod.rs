//! Data models for synced documents.
//!
//! - `Record`: a timestamped vector of measurements
//! - `DocumentData`: partition name → ordered record sequence

pub mod record;

pub use record::{DocumentData, Record};

//! The report queue and worker pool (C6, spec.md §4.6).

pub mod error;
pub mod worker;

pub use error::QueueError;
pub use worker::{NullScorer, ReportScorer, DEFAULT_POLL_INTERVAL_SECS};

//! The cluster driver (C2): renders job templates and submits/stops jobs on
//! the external scheduler's HTTP API.

pub mod client;
pub mod error;
pub mod template;

pub use client::SchedulerClient;
pub use error::SchedulerError;
pub use template::{JobKind, JobSubstitutions, JobTemplate};

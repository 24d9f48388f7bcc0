//! Error type for the report queue worker (C6).

use thiserror::Error;

/// Errors produced while claiming, scoring, or completing a report.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The entity store could not be reached or returned an unexpected
    /// error while claiming or completing a report.
    #[error(transparent)]
    Entity(#[from] platform_entities::EntityError),

    /// A report's lease went stale before this worker finished — another
    /// worker has already reclaimed it, or an operator reset it. Reported
    /// and abandoned, never retried, per spec.md §4.6/§7.
    #[error("stale lease for report {report_id}")]
    StaleLease { report_id: uuid::Uuid },
}

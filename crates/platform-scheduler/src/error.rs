//! Error type for the cluster driver (C2).

use thiserror::Error;

/// Errors produced while rendering or submitting a job to the external
/// cluster scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler's parse or submit call returned a non-2xx status, or
    /// the HTTP call itself failed. Never partially applied — the submit
    /// call is only attempted once the parse call has succeeded (§4.2).
    #[error("job submission failed: {0}")]
    JobSubmissionFailed(String),

    /// `exists`/`stop` received a status other than 200/404.
    #[error("scheduler unavailable: {0}")]
    SchedulerUnavailable(String),

    /// The HTTP transport itself failed (timeout, DNS, connection reset).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

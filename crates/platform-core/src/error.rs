//! Error type for the model lifecycle manager (C4).

use platform_entities::EntityError;
use platform_scheduler::SchedulerError;
use thiserror::Error;

/// Errors produced by lifecycle operations (train/deploy/undeploy/delete
/// and their callbacks).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Malformed input (names, missing fields, disallowed modes). Maps to
    /// HTTP 400 (§7).
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// A duplicate train request for the same `(owner, name)` while one is
    /// already in flight. Maps to HTTP 409 (§4.4).
    #[error("Model with name {name} already exists for user {owner}")]
    DuplicateTrain { owner: String, name: String },

    /// Wraps any entity-store failure (not-found, conflict, validation, or
    /// a raw database error) — `platform-server`'s `ApiError` inspects the
    /// inner variant to pick the right HTTP status.
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// The license or job-count quota check failed. Deliberately mapped to
    /// HTTP 400, not 402/429 — a resource limit is a client error here, not
    /// "non-retryable to the client".
    #[error("Resource limit reached: {0}")]
    ResourceLimitReached(String),

    /// A model with live dependents or a live deployment was asked to
    /// delete/undeploy in a way the state machine forbids. Maps to HTTP 400.
    #[error("{0}")]
    InvalidTransition(String),

    /// The cluster scheduler rejected or could not be reached for a job
    /// submission or stop. Maps to HTTP 500 (§7 Upstream).
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Free disk space on the bazaar volume dropped below the configured
    /// threshold. Maps to HTTP 507 (§4.5 "low-disk" guard).
    #[error("insufficient disk space: {0}")]
    LowDisk(String),

    /// A filesystem operation on the bazaar tree failed.
    #[error("artifact filesystem error: {0}")]
    Artifact(#[from] std::io::Error),
}

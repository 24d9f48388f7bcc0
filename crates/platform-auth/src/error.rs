//! Error type for the permission cache (C3).

use thiserror::Error;

/// Errors produced while resolving or enforcing a caller's permissions.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token or API key was presented, or the presented
    /// credential does not resolve to a permission set.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The credential resolved, but lacked the permission the caller's
    /// route requires (write, override, ...).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The upstream auth source could not be reached to resolve a token.
    #[error("auth source unreachable: {0}")]
    SourceUnreachable(#[from] reqwest::Error),
}

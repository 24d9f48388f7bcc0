//! Error type for the entity store.
//!
//! Every repository function returns `Result<T, EntityError>`. Callers map
//! this onto an HTTP response via `platform-server`'s `ApiError`.

use thiserror::Error;

/// Errors produced by entity-store operations.
#[derive(Debug, Error)]
pub enum EntityError {
    /// No row matched the lookup.
    #[error("{what} not found")]
    NotFound { what: &'static str },

    /// A unique constraint was violated (duplicate name, duplicate membership, ...).
    #[error("{what} already exists")]
    Conflict { what: &'static str },

    /// The caller-supplied value failed validation before any query ran.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The underlying database connection or query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EntityError {
    /// Map a `sqlx::Error` to `Conflict` when it is a unique-violation, else
    /// fall through to `NotFound`/`Database` as appropriate.
    #[must_use]
    pub fn from_unique_violation(err: sqlx::Error, what: &'static str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.code().as_deref() == Some("23505")
        {
            return Self::Conflict { what };
        }
        Self::Database(err)
    }
}

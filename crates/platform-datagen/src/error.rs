//! Error type for the synthetic-data subsystem.

use thiserror::Error;

/// Errors produced by C8 — prompt assembly, LLM dispatch, the sample
/// store, and CSV export.
#[derive(Debug, Error)]
pub enum DatagenError {
    /// The underlying database connection or query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An LLM provider call failed (network error, non-2xx response, or
    /// malformed completion body). Per §4.8, this never aborts the whole
    /// batch — the caller writes it to the traceback file and continues.
    #[error("LLM call failed: {0}")]
    LlmCall(String),

    /// Writing generated rows to the output CSV failed.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// A filesystem operation (traceback file, output directory) failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

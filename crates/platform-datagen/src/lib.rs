//! Synthetic-data subsystem (C8, spec.md §4.8): prompt assembly, a
//! bounded worker pool fanning out LLM calls, a reservoir-sampled sample
//! store, and CSV export with a per-tag train/test split.

use sqlx::PgPool;

pub mod csv_writer;
pub mod error;
pub mod generators;
pub mod llm;
pub mod prompt;
pub mod sampler;
pub mod worker;

pub use error::DatagenError;

/// Connect to Postgres and apply this crate's own embedded migrations —
/// the sample store lives in its own tables, separate from the entity
/// store's schema, mirroring `platform-entities::connect`'s shape.
///
/// # Errors
///
/// Returns an error if the connection or migration fails.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

//! Typed Postgres access for the model lifecycle platform.
//!
//! Every query lives behind a function in [`repository`] — callers never
//! build SQL themselves. All functions take `&PgPool` (or `&mut
//! sqlx::PgConnection` where a caller needs to compose several calls inside
//! one transaction) and return [`error::EntityError`].

pub mod error;
pub mod models;
pub mod repository;

pub use error::EntityError;
pub use sqlx::PgPool;

/// Connect to Postgres and run the embedded migrations.
///
/// # Errors
///
/// Returns an error if the connection cannot be established or a migration
/// fails to apply.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

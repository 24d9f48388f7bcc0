use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EntityError;
use crate::models::UserSession;

/// Persist the SHA-256 hash of a freshly minted bearer token.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or constraint failure.
pub async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<UserSession, EntityError> {
    sqlx::query_as::<_, UserSession>(
        r"
        INSERT INTO user_sessions (user_id, token_hash, expires_at)
        VALUES ($1, $2, $3)
        RETURNING *
        ",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(pool)
    .await
    .map_err(EntityError::Database)
}

/// Look up a non-expired session by its token hash.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if the hash is unknown or the session
/// has expired.
pub async fn get_session_by_hash(pool: &PgPool, token_hash: &str) -> Result<UserSession, EntityError> {
    sqlx::query_as::<_, UserSession>(
        "SELECT * FROM user_sessions WHERE token_hash = $1 AND expires_at > now()",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?
    .ok_or(EntityError::NotFound { what: "session" })
}

/// Revoke a session (logout). Idempotent: deleting an already-gone session
/// is not an error.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection failure.
pub async fn delete_session(pool: &PgPool, token_hash: &str) -> Result<(), EntityError> {
    sqlx::query("DELETE FROM user_sessions WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Drop every session past its `expires_at`, called from the same
/// background sweep as [`crate::repository::reports::claim_next_report`]'s
/// stale-lease reclaim.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection failure.
pub async fn delete_expired_sessions(pool: &PgPool) -> Result<u64, EntityError> {
    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at <= now()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a live Postgres instance; run under `cargo test -- --ignored` with DATABASE_URL set"]
    async fn create_then_fetch_session() {
        let pool = PgPool::connect(&std::env::var("DATABASE_URL").unwrap_or_default())
            .await
            .unwrap();
        let user = crate::repository::create_user(&pool, "bob", "bob@example.com", "hash", "nonce")
            .await
            .unwrap();
        let expires_at = Utc::now() + chrono::Duration::hours(1);
        let created = create_session(&pool, user.id, "deadbeef", expires_at).await.unwrap();
        let fetched = get_session_by_hash(&pool, "deadbeef").await.unwrap();
        assert_eq!(created.id, fetched.id);
    }
}

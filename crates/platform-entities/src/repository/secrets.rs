//! Per-team encrypted secret storage (`vault/add-secret`, `vault/get-secret`,
//! §6). This module only moves ciphertext — encryption and decryption live
//! one layer up, in `platform-core::vault`.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EntityError;
use crate::models::TeamSecret;

/// Upsert a team's secret under `key`, replacing any prior ciphertext.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn put_secret(
    pool: &PgPool,
    team_id: Uuid,
    key: &str,
    ciphertext: &[u8],
    nonce: &[u8],
    comment: &str,
) -> Result<TeamSecret, EntityError> {
    sqlx::query_as::<_, TeamSecret>(
        r"
        INSERT INTO team_secrets (team_id, key, ciphertext, nonce, comment)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (team_id, key)
        DO UPDATE SET ciphertext = $3, nonce = $4, comment = $5, updated_at = now()
        RETURNING *
        ",
    )
    .bind(team_id)
    .bind(key)
    .bind(ciphertext)
    .bind(nonce)
    .bind(comment)
    .fetch_one(pool)
    .await
    .map_err(EntityError::Database)
}

/// Fetch one team secret by key.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if no such secret exists.
pub async fn get_secret(pool: &PgPool, team_id: Uuid, key: &str) -> Result<TeamSecret, EntityError> {
    sqlx::query_as::<_, TeamSecret>(
        "SELECT * FROM team_secrets WHERE team_id = $1 AND key = $2",
    )
    .bind(team_id)
    .bind(key)
    .fetch_optional(pool)
    .await?
    .ok_or(EntityError::NotFound { what: "secret" })
}

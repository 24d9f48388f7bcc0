//! Password hashing and bearer-token issuance for `user/email-login` (§6).
//!
//! The teacher has no JWT-signing dependency anywhere (`zvault-server`
//! delegates signature verification to Clerk's own JWKS, out of scope
//! here) — `generate_service_token`/`hash_token` in
//! `zvault-server::cloud::auth` and `vaultrs-core::token::TokenStore` both
//! mint an opaque UUID v4 token and persist only its SHA-256 hash. This
//! module follows that pattern: `user/email-login` returns a plaintext
//! token once; only its hash ever reaches `user_sessions`.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use platform_auth::{AuthError, AuthSource, Permissions};
use platform_entities::{repository, PgPool};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Hash a plaintext password for storage (`user/email-signup-basic`).
///
/// # Errors
///
/// Returns an error if the underlying Argon2id call fails.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored Argon2id hash
/// (`user/email-login`'s HTTP Basic step).
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// SHA-256 hash of a bearer token, hex-encoded — the only form a token
/// ever takes once it leaves `user/email-login`'s response body
/// (`zvault-server::cloud::auth::hash_token`).
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Mint a new opaque bearer token: a UUID v4, formatted exactly the way
/// `zvault-server::cloud::auth::generate_service_token` builds its own
/// service tokens.
#[must_use]
pub fn generate_token() -> String {
    format!("plt_{}", Uuid::new_v4().simple())
}

/// Issue a new session for `user_id`, persisting only the token's hash.
/// Returns the plaintext token — it is never retrievable again.
///
/// # Errors
///
/// Returns [`platform_entities::EntityError`] on a connection failure.
pub async fn issue_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl: std::time::Duration,
) -> Result<String, platform_entities::EntityError> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    let expires_at = Utc::now()
        + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(30));
    repository::create_session(pool, user_id, &token_hash, expires_at).await?;
    Ok(token)
}

/// Resolves a presented bearer token/API key to [`Permissions`] by hashing
/// it and looking up the session row directly in Postgres — unlike
/// `platform-deploy`'s `ControlPlaneAuthSource`, the control plane owns the
/// user table itself and never calls back out to its own HTTP API for this
/// (§4.3: "the control plane's auth endpoint" is what other processes call;
/// this is that endpoint's implementation).
pub struct LocalAuthSource {
    pool: PgPool,
}

impl LocalAuthSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuthSource for LocalAuthSource {
    async fn fetch(&self, token: &str) -> Result<Permissions, AuthError> {
        let token_hash = hash_token(token);
        let session = repository::get_session_by_hash(&self.pool, &token_hash)
            .await
            .map_err(|_| AuthError::Unauthorized("invalid or expired token".to_owned()))?;
        let user = repository::get_user(&self.pool, session.user_id)
            .await
            .map_err(|_| AuthError::Unauthorized("invalid or expired token".to_owned()))?;

        Ok(Permissions {
            read: true,
            write: user.verified,
            r#override: user.global_admin,
            username: user.username,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trips_through_hash_then_verify() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn token_hash_is_deterministic() {
        let token = generate_token();
        assert_eq!(hash_token(&token), hash_token(&token));
    }

    #[test]
    fn distinct_tokens_hash_differently() {
        assert_ne!(hash_token(&generate_token()), hash_token(&generate_token()));
    }
}

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EntityError;
use crate::models::User;

/// Create a new user with the given credentials.
///
/// # Errors
///
/// Returns [`EntityError::Conflict`] if `username` or `email` is already
/// taken.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
    verification_nonce: &str,
) -> Result<User, EntityError> {
    sqlx::query_as::<_, User>(
        r"
        INSERT INTO users (username, email, password_hash, verification_nonce)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        ",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(verification_nonce)
    .fetch_one(pool)
    .await
    .map_err(|e| EntityError::from_unique_violation(e, "user"))
}

/// Look up a user by username.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if no such user exists.
pub async fn get_user_by_username(pool: &PgPool, username: &str) -> Result<User, EntityError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or(EntityError::NotFound { what: "user" })
}

/// Look up a user by id.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if no such user exists.
pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<User, EntityError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(EntityError::NotFound { what: "user" })
}

/// Mark a user verified, consuming their verification nonce.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if the nonce does not match a pending
/// user.
pub async fn verify_user(pool: &PgPool, username: &str, nonce: &str) -> Result<User, EntityError> {
    sqlx::query_as::<_, User>(
        r"
        UPDATE users
        SET verified = TRUE, verification_nonce = NULL, updated_at = now()
        WHERE username = $1 AND verification_nonce = $2
        RETURNING *
        ",
    )
    .bind(username)
    .bind(nonce)
    .fetch_optional(pool)
    .await?
    .ok_or(EntityError::NotFound { what: "pending user" })
}

/// Grant `global_admin` to a user (`user/add-global-admin`, §6).
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if the user does not exist.
pub async fn set_global_admin(pool: &PgPool, id: Uuid, global_admin: bool) -> Result<User, EntityError> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET global_admin = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(global_admin)
    .fetch_optional(pool)
    .await?
    .ok_or(EntityError::NotFound { what: "user" })
}

/// Delete a user outright. Cascades memberships only — never another
/// user's rows (§3: "deletion cascades memberships, not users").
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if the user does not exist.
pub async fn delete_user(pool: &PgPool, id: Uuid) -> Result<(), EntityError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(EntityError::NotFound { what: "user" });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a live Postgres instance; run under `cargo test -- --ignored` with DATABASE_URL set"]
    async fn create_then_fetch_user() {
        let pool = PgPool::connect(&std::env::var("DATABASE_URL").unwrap_or_default())
            .await
            .unwrap();
        let created = create_user(&pool, "alice", "alice@example.com", "hash", "nonce")
            .await
            .unwrap();
        let fetched = get_user_by_username(&pool, "alice").await.unwrap();
        assert_eq!(created.id, fetched.id);
    }
}

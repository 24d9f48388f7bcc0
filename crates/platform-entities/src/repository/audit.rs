use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EntityError;
use crate::models::AuditEntry;

/// Append one audit record. Never fails silently — a failed write must
/// propagate, since audit is the caller's only record of the action.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
#[allow(clippy::too_many_arguments)]
pub async fn record_audit_entry(
    pool: &PgPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: &str,
    detail: serde_json::Value,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<AuditEntry, EntityError> {
    sqlx::query_as::<_, AuditEntry>(
        r"
        INSERT INTO audit_log (user_id, action, resource, detail, ip_address, user_agent)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        ",
    )
    .bind(user_id)
    .bind(action)
    .bind(resource)
    .bind(detail)
    .bind(ip_address)
    .bind(user_agent)
    .fetch_one(pool)
    .await
    .map_err(EntityError::Database)
}

/// List the most recent audit entries for a resource, newest first.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn list_audit_for_resource(
    pool: &PgPool,
    resource: &str,
    limit: i64,
) -> Result<Vec<AuditEntry>, EntityError> {
    let rows = sqlx::query_as::<_, AuditEntry>(
        "SELECT * FROM audit_log WHERE resource = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(resource)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

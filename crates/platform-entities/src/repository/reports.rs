//! The report lease protocol (C6, §4.6).
//!
//! A worker claims the oldest queued report with `FOR UPDATE SKIP LOCKED` so
//! that concurrent workers never contend on the same row, then marks it
//! `in_progress` inside the same transaction before releasing the lock.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EntityError;
use crate::models::Report;

/// Maximum number of claim attempts before a report is abandoned as failed.
pub const MAX_ATTEMPTS: i32 = 3;

/// How long a claimed report may sit `in_progress` before its lease is
/// considered stale and eligible for reclaim by another worker (§4.6).
pub const REPORT_TIMEOUT: chrono::Duration = chrono::Duration::minutes(10);

/// Submit a new report request for a model.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn submit_report(
    pool: &PgPool,
    model_id: Uuid,
    documents: serde_json::Value,
) -> Result<Report, EntityError> {
    sqlx::query_as::<_, Report>(
        "INSERT INTO reports (model_id, documents) VALUES ($1, $2) RETURNING *",
    )
    .bind(model_id)
    .bind(documents)
    .fetch_one(pool)
    .await
    .map_err(EntityError::Database)
}

/// Atomically claim the oldest queued report — or the oldest `in_progress`
/// report whose lease has gone stale — and move it to `in_progress` (§4.6's
/// lease protocol: a crashed or hung worker's claim is reclaimable once
/// `updated_at` is older than [`REPORT_TIMEOUT`], as long as attempts
/// remain).
///
/// Returns `Ok(None)` when nothing is claimable — this is not an error.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn claim_next_report(pool: &PgPool) -> Result<Option<Report>, EntityError> {
    let mut tx = pool.begin().await?;
    let stale_cutoff = Utc::now() - REPORT_TIMEOUT;

    let claimed = sqlx::query_as::<_, Report>(
        r"
        SELECT * FROM reports
        WHERE status = 'queued'
           OR (status = 'in_progress' AND attempt < $1 AND updated_at < $2)
        ORDER BY submitted_at ASC
        FOR UPDATE SKIP LOCKED
        LIMIT 1
        ",
    )
    .bind(MAX_ATTEMPTS)
    .bind(stale_cutoff)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(report) = claimed else {
        tx.commit().await?;
        return Ok(None);
    };

    let updated = sqlx::query_as::<_, Report>(
        r"
        UPDATE reports
        SET status = 'in_progress', attempt = attempt + 1, updated_at = now()
        WHERE id = $1
        RETURNING *
        ",
    )
    .bind(report.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(updated))
}

/// Mark a report complete. Fails if the report is not currently
/// `in_progress` under the caller's expected attempt — i.e. the lease has
/// gone stale (reclaimed by another worker or reset).
///
/// # Errors
///
/// Returns [`EntityError::Conflict`] if the lease is stale.
pub async fn complete_report(
    pool: &PgPool,
    id: Uuid,
    expected_attempt: i32,
) -> Result<Report, EntityError> {
    sqlx::query_as::<_, Report>(
        r"
        UPDATE reports
        SET status = 'complete', updated_at = now()
        WHERE id = $1 AND status = 'in_progress' AND attempt = $2
        RETURNING *
        ",
    )
    .bind(id)
    .bind(expected_attempt)
    .fetch_optional(pool)
    .await?
    .ok_or(EntityError::Conflict { what: "report lease" })
}

/// Mark a report failed, re-queueing it unless it has exhausted
/// [`MAX_ATTEMPTS`]. Guarded by `expected_attempt` the same way
/// [`complete_report`] is — the completion POST's stale-lease check in
/// §4.6 applies to both `complete` and `failed` statuses, since a worker
/// that no longer owns the lease must not be able to mutate the row.
///
/// # Errors
///
/// Returns [`EntityError::Conflict`] if the lease is stale.
pub async fn fail_report(
    pool: &PgPool,
    id: Uuid,
    expected_attempt: i32,
    msg: &str,
) -> Result<Report, EntityError> {
    sqlx::query_as::<_, Report>(
        r"
        UPDATE reports
        SET
            status = CASE WHEN attempt >= $3 THEN 'failed' ELSE 'queued' END,
            msg = $4,
            updated_at = now()
        WHERE id = $1 AND status = 'in_progress' AND attempt = $2
        RETURNING *
        ",
    )
    .bind(id)
    .bind(expected_attempt)
    .bind(MAX_ATTEMPTS)
    .bind(msg)
    .fetch_optional(pool)
    .await?
    .ok_or(EntityError::Conflict { what: "report lease" })
}

/// Manual recovery path: reset a report back to `queued` with `attempt = 0`,
/// for an operator to re-run a report that exhausted its attempts.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if the report does not exist.
pub async fn reset_report(pool: &PgPool, id: Uuid) -> Result<Report, EntityError> {
    sqlx::query_as::<_, Report>(
        r"
        UPDATE reports
        SET status = 'queued', attempt = 0, msg = NULL, updated_at = now()
        WHERE id = $1
        RETURNING *
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(EntityError::NotFound { what: "report" })
}

/// List reports stuck `in_progress` past `timeout` — a stale worker lease.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn list_stale_leases(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Report>, EntityError> {
    let rows = sqlx::query_as::<_, Report>(
        "SELECT * FROM reports WHERE status = 'in_progress' AND updated_at < $1",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

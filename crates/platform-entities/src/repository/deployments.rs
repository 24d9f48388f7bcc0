use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EntityError;
use crate::models::{Deployment, DeploymentStatus};

/// Create a deployment row for `model_id` in `not_started` status.
///
/// # Errors
///
/// Returns [`EntityError::Conflict`] if a live deployment already exists for
/// this model (the partial unique index in migrations enforces this; a
/// violation surfaces here as `23505`).
pub async fn create_deployment(
    pool: &PgPool,
    model_id: Uuid,
    name: &str,
    autoscaling_enabled: bool,
    memory_hint: Option<i32>,
) -> Result<Deployment, EntityError> {
    sqlx::query_as::<_, Deployment>(
        r"
        INSERT INTO deployments (model_id, name, autoscaling_enabled, memory_hint)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        ",
    )
    .bind(model_id)
    .bind(name)
    .bind(autoscaling_enabled)
    .bind(memory_hint)
    .fetch_one(pool)
    .await
    .map_err(|e| EntityError::from_unique_violation(e, "deployment"))
}

/// Look up a deployment by id.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if no such deployment exists.
pub async fn get_deployment(pool: &PgPool, id: Uuid) -> Result<Deployment, EntityError> {
    sqlx::query_as::<_, Deployment>("SELECT * FROM deployments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(EntityError::NotFound { what: "deployment" })
}

/// Find the current live deployment for a model, if any.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn get_live_deployment(
    pool: &PgPool,
    model_id: Uuid,
) -> Result<Option<Deployment>, EntityError> {
    let row = sqlx::query_as::<_, Deployment>(
        r"
        SELECT * FROM deployments
        WHERE model_id = $1 AND status IN ('starting', 'in_progress', 'complete')
        ",
    )
    .bind(model_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Transition a deployment's status, optionally recording the scheduler job id.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if the deployment does not exist, or
/// [`EntityError::Conflict`] if the transition would create a second live
/// deployment for the same model.
pub async fn set_deployment_status(
    pool: &PgPool,
    id: Uuid,
    status: DeploymentStatus,
    job_id: Option<&str>,
) -> Result<Deployment, EntityError> {
    sqlx::query_as::<_, Deployment>(
        r"
        UPDATE deployments
        SET status = $2, job_id = COALESCE($3, job_id), updated_at = now()
        WHERE id = $1
        RETURNING *
        ",
    )
    .bind(id)
    .bind(status)
    .bind(job_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| EntityError::from_unique_violation(e, "deployment"))?
    .ok_or(EntityError::NotFound { what: "deployment" })
}

/// Every deployment that was `starting`/`in_progress` before `cutoff` —
/// used by the stale-in-progress sweeper (§4.4).
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn list_stale_in_progress(
    pool: &PgPool,
    cutoff: chrono::DateTime<chrono::Utc>,
) -> Result<Vec<Deployment>, EntityError> {
    let rows = sqlx::query_as::<_, Deployment>(
        r"
        SELECT * FROM deployments
        WHERE status IN ('starting', 'in_progress') AND updated_at < $1
        ",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EntityError;
use crate::models::{AccessLevel, Model, ModelType, TrainStatus};

/// Create a new model row in `not_started` status.
///
/// # Errors
///
/// Returns [`EntityError::Conflict`] if `(owner_username, model_name)` is
/// already taken.
pub async fn create_model(
    pool: &PgPool,
    owner_username: &str,
    model_name: &str,
    model_type: ModelType,
    subtype: Option<&str>,
    parent_id: Option<Uuid>,
) -> Result<Model, EntityError> {
    sqlx::query_as::<_, Model>(
        r"
        INSERT INTO models (owner_username, model_name, model_type, subtype, parent_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        ",
    )
    .bind(owner_username)
    .bind(model_name)
    .bind(model_type)
    .bind(subtype)
    .bind(parent_id)
    .fetch_one(pool)
    .await
    .map_err(|e| EntityError::from_unique_violation(e, "model"))
}

/// Look up a model by id.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if no such model exists.
pub async fn get_model(pool: &PgPool, id: Uuid) -> Result<Model, EntityError> {
    sqlx::query_as::<_, Model>("SELECT * FROM models WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(EntityError::NotFound { what: "model" })
}

/// Cheap existence check used by the `model/name-check` endpoint (§SPEC_FULL
/// C4 supplement) — callers poll this before submitting a train request.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn model_name_taken(
    pool: &PgPool,
    owner_username: &str,
    model_name: &str,
) -> Result<bool, EntityError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM models WHERE owner_username = $1 AND model_name = $2)",
    )
    .bind(owner_username)
    .bind(model_name)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Transition a model's `train_status`.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if the model does not exist.
pub async fn set_train_status(
    pool: &PgPool,
    id: Uuid,
    status: TrainStatus,
) -> Result<Model, EntityError> {
    sqlx::query_as::<_, Model>(
        "UPDATE models SET train_status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await?
    .ok_or(EntityError::NotFound { what: "model" })
}

/// Update a model's visibility.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if the model does not exist.
pub async fn set_access_level(
    pool: &PgPool,
    id: Uuid,
    access_level: AccessLevel,
) -> Result<Model, EntityError> {
    sqlx::query_as::<_, Model>(
        "UPDATE models SET access_level = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(access_level)
    .fetch_optional(pool)
    .await?
    .ok_or(EntityError::NotFound { what: "model" })
}

/// Record that `model_id` depends on `depends_on_id` (the "used_by" DAG
/// edge, §3).
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn add_dependency(
    pool: &PgPool,
    model_id: Uuid,
    depends_on_id: Uuid,
) -> Result<(), EntityError> {
    sqlx::query(
        r"
        INSERT INTO model_dependencies (model_id, depends_on_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(model_id)
    .bind(depends_on_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove a "used_by" DAG edge (`workflow/delete-models`, §6).
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn remove_dependency(
    pool: &PgPool,
    model_id: Uuid,
    depends_on_id: Uuid,
) -> Result<(), EntityError> {
    sqlx::query("DELETE FROM model_dependencies WHERE model_id = $1 AND depends_on_id = $2")
        .bind(model_id)
        .bind(depends_on_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// List every model that depends on `model_id` — used to block deletion of
/// a model still referenced by another (§4.4 terminal-delete rules).
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn list_dependents(pool: &PgPool, model_id: Uuid) -> Result<Vec<Model>, EntityError> {
    let rows = sqlx::query_as::<_, Model>(
        r"
        SELECT m.* FROM models m
        JOIN model_dependencies d ON d.model_id = m.id
        WHERE d.depends_on_id = $1
        ",
    )
    .bind(model_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// List every model `model_id` itself depends on — the forward edge of the
/// "used_by" DAG (§3), used to walk a composite model's dependencies when
/// undeploying or deleting it (§4.4).
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn list_dependencies(pool: &PgPool, model_id: Uuid) -> Result<Vec<Model>, EntityError> {
    let rows = sqlx::query_as::<_, Model>(
        r"
        SELECT m.* FROM models m
        JOIN model_dependencies d ON d.depends_on_id = m.id
        WHERE d.model_id = $1
        ",
    )
    .bind(model_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Count how many *other* models than `excluding_model_id` both depend on
/// `dependency_id` and are currently deployed (§4.4: a cascade-undeployed
/// dependency is only stopped once its live reference count drops to zero
/// after removing the caller's own reference).
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn count_other_live_dependents(
    pool: &PgPool,
    dependency_id: Uuid,
    excluding_model_id: Uuid,
) -> Result<i64, EntityError> {
    let count: i64 = sqlx::query_scalar(
        r"
        SELECT COUNT(*) FROM model_dependencies d
        JOIN deployments dep ON dep.model_id = d.model_id
        WHERE d.depends_on_id = $1
          AND d.model_id != $2
          AND dep.status IN ('starting', 'in_progress', 'complete')
        ",
    )
    .bind(dependency_id)
    .bind(excluding_model_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Delete a model row outright. Callers must have already verified there
/// are no live dependents or deployments (§4.4).
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if the model does not exist.
pub async fn delete_model(pool: &PgPool, id: Uuid) -> Result<(), EntityError> {
    let result = sqlx::query("DELETE FROM models WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(EntityError::NotFound { what: "model" });
    }
    Ok(())
}

/// List models visible to a given owner/team scope, optionally filtered by
/// access level. Used by the model listing endpoint (§6).
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn list_models_for_owner(
    pool: &PgPool,
    owner_username: &str,
) -> Result<Vec<Model>, EntityError> {
    let rows = sqlx::query_as::<_, Model>(
        "SELECT * FROM models WHERE owner_username = $1 AND hidden = FALSE ORDER BY created_at DESC",
    )
    .bind(owner_username)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

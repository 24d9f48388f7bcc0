//! `model/*` routes (§6, `SPEC_FULL.md` §5 C4 supplements): naming,
//! access control, snapshotting, and deletion operations that sit
//! outside the train/deploy job lifecycle itself.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use platform_auth::AuthzToken;
use platform_entities::models::AccessLevel;
use platform_entities::repository;
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Routes requiring `write` permission.
pub fn write_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/model/save-deployed", post(save_deployed))
        .route("/model/update-access-level", post(update_access_level))
        .route("/model/delete", delete(model_delete))
}

/// Routes requiring `read` permission.
pub fn read_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/model/name-check", get(name_check))
        .route("/model/logs", get(model_logs))
        .route("/model/list", get(model_list))
}

#[derive(Debug, Deserialize)]
struct NameCheckQuery {
    owner_username: String,
    model_name: String,
}

async fn name_check(
    State(state): State<Arc<AppState>>,
    Query(req): Query<NameCheckQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let taken =
        repository::model_name_taken(&state.pool, &req.owner_username, &req.model_name).await?;
    Ok(Envelope::ok("ok", serde_json::json!({ "taken": taken })))
}

#[derive(Debug, Deserialize)]
struct SaveDeployedRequest {
    model_id: Uuid,
    new_model_name: String,
}

async fn save_deployed(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<SaveDeployedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = state
        .lifecycle
        .save_deployed(req.model_id, &req.new_model_name)
        .await?;
    Ok(Envelope::ok(
        "model snapshot saved",
        serde_json::json!({ "model_id": saved.id }),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateAccessLevelRequest {
    model_id: Uuid,
    access_level: AccessLevel,
}

async fn update_access_level(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<UpdateAccessLevelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let model = state
        .lifecycle
        .update_access_level(req.model_id, req.access_level)
        .await?;
    Ok(Envelope::ok(
        "access level updated",
        serde_json::json!({ "model_id": model.id, "access_level": model.access_level }),
    ))
}

#[derive(Debug, Deserialize)]
struct ModelIdQuery {
    model_id: Uuid,
}

async fn model_delete(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Query(req): Query<ModelIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle.delete_model(req.model_id).await?;
    Ok(Envelope::<()>::accepted("model deleted"))
}

#[derive(Debug, Deserialize)]
struct ModelLogsQuery {
    model_id: Uuid,
    #[serde(default = "default_log_lines")]
    lines: usize,
}

fn default_log_lines() -> usize {
    platform_core::logs::DEFAULT_TAIL_LINES
}

async fn model_logs(
    State(state): State<Arc<AppState>>,
    Query(req): Query<ModelLogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let lines =
        platform_core::logs::tail_train_log(&state.config.bazaar_dir, req.model_id, req.lines)
            .await?;
    Ok(Envelope::ok("ok", serde_json::json!({ "lines": lines })))
}

#[derive(Debug, Deserialize)]
struct ModelListQuery {
    owner_username: String,
}

async fn model_list(
    State(state): State<Arc<AppState>>,
    Query(req): Query<ModelListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let models = repository::list_models_for_owner(&state.pool, &req.owner_username).await?;
    Ok(Envelope::ok("ok", serde_json::json!({ "models": models })))
}

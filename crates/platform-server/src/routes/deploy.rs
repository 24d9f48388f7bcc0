//! `deploy/*` routes (§6): starting/stopping inference deployments, the
//! deployment-process callbacks, and read-only status/log endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use platform_auth::AuthzToken;
use platform_entities::models::DeploymentStatus;
use platform_entities::repository;
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::middleware::require_task_runner;
use crate::state::AppState;

/// Routes requiring `write` permission.
pub fn write_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deploy/run", post(deploy_run))
        .route("/deploy/stop", post(deploy_stop))
}

/// Routes requiring `read` permission.
pub fn read_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deploy/status", get(deploy_status))
        .route("/deploy/log", post(deploy_log))
}

/// Routes authenticated by the shared task-runner token.
pub fn callback_router() -> Router<Arc<AppState>> {
    Router::new().route("/deploy/complete", post(deploy_complete))
}

#[derive(Debug, Deserialize)]
struct DeployRunRequest {
    model_id: Uuid,
    name: String,
    #[serde(default)]
    autoscaling_enabled: bool,
    memory_mb: Option<i32>,
}

async fn deploy_run(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<DeployRunRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let deployment = state
        .lifecycle
        .deploy_run(req.model_id, &req.name, req.autoscaling_enabled, req.memory_mb)
        .await?;
    Ok(Envelope::ok(
        "deployment submitted",
        serde_json::json!({ "deployment_id": deployment.id, "status": deployment.status }),
    ))
}

#[derive(Debug, Deserialize)]
struct ModelIdRequest {
    model_id: Uuid,
}

async fn deploy_stop(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<ModelIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle.undeploy(req.model_id).await?;
    Ok(Envelope::<()>::accepted("deployment stopped"))
}

#[derive(Debug, Deserialize)]
struct ModelIdQuery {
    model_id: Uuid,
}

async fn deploy_status(
    State(state): State<Arc<AppState>>,
    Query(req): Query<ModelIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let deployment = repository::get_live_deployment(&state.pool, req.model_id).await?;
    Ok(Envelope::ok(
        "ok",
        serde_json::json!({ "deployment": deployment }),
    ))
}

#[derive(Debug, Deserialize)]
struct DeployLogQuery {
    model_id: Uuid,
    alloc_id: Uuid,
    #[serde(default = "default_log_lines")]
    lines: usize,
}

fn default_log_lines() -> usize {
    platform_core::logs::DEFAULT_TAIL_LINES
}

async fn deploy_log(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeployLogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let lines = platform_core::logs::tail_deployment_log(
        &state.config.bazaar_dir,
        req.model_id,
        req.alloc_id,
        req.lines,
    )
    .await?;
    Ok(Envelope::ok("ok", serde_json::json!({ "lines": lines })))
}

#[derive(Debug, Deserialize)]
struct DeployCompleteRequest {
    deployment_id: Uuid,
    status: DeploymentStatus,
}

async fn deploy_complete(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(req): Json<DeployCompleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_task_runner(&state, &headers)?;
    let deployment = state
        .lifecycle
        .deploy_complete(req.deployment_id, req.status)
        .await?;
    Ok(Envelope::ok(
        "deployment status recorded",
        serde_json::json!({ "deployment_id": deployment.id, "status": deployment.status }),
    ))
}

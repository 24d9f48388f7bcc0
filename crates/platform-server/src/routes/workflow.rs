//! `workflow/*` routes (§6): composite-model management — building a
//! model out of other models' outputs (enterprise-search over an NDB
//! plus a guardrail NLP model, knowledge-extraction over a set of
//! extraction models) via the "used_by" dependency DAG (§3).
//!
//! Composite models carry no training job of their own — `workflow/create`
//! and its two named shorthands only register the row and its
//! dependency edges; `workflow/start`/`workflow/stop` drive the same
//! deploy/undeploy cascade as a leaf model's `deploy/run`/`deploy/stop`.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Extension, Json, Router};
use platform_auth::AuthzToken;
use platform_entities::models::{ModelType, TrainStatus};
use platform_entities::repository;
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Routes requiring `write` permission.
pub fn write_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/workflow/enterprise-search", post(enterprise_search))
        .route("/workflow/knowledge-extraction", post(knowledge_extraction))
        .route("/workflow/create", post(create))
        .route("/workflow/add-models", post(add_models))
        .route("/workflow/delete-models", post(delete_models))
        .route("/workflow/start", post(start))
        .route("/workflow/stop", post(stop))
        .route("/workflow/validate", post(validate))
        .route("/workflow/delete", post(delete))
}

async fn register_composite(
    state: &AppState,
    owner_username: &str,
    model_name: &str,
    model_type: ModelType,
    dependency_ids: &[Uuid],
) -> Result<serde_json::Value, ApiError> {
    platform_core::validate::validate_name("owner_username", owner_username)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    platform_core::validate::validate_name("model_name", model_name)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let model =
        repository::create_model(&state.pool, owner_username, model_name, model_type, None, None)
            .await?;

    for dependency_id in dependency_ids {
        repository::get_model(&state.pool, *dependency_id).await?;
        repository::add_dependency(&state.pool, model.id, *dependency_id).await?;
    }

    // Composite models have no training job of their own — the
    // dependency closure they reference is already trained, so the row
    // is immediately usable once its edges exist.
    let model = repository::set_train_status(&state.pool, model.id, TrainStatus::Complete).await?;

    Ok(serde_json::json!({ "model_id": model.id, "train_status": model.train_status }))
}

#[derive(Debug, Deserialize)]
struct EnterpriseSearchRequest {
    owner_username: String,
    model_name: String,
    ndb_model_id: Uuid,
    guardrail_model_id: Uuid,
}

async fn enterprise_search(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<EnterpriseSearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let data = register_composite(
        &state,
        &req.owner_username,
        &req.model_name,
        ModelType::EnterpriseSearch,
        &[req.ndb_model_id, req.guardrail_model_id],
    )
    .await?;
    Ok(Envelope::ok("enterprise-search workflow created", data))
}

#[derive(Debug, Deserialize)]
struct KnowledgeExtractionRequest {
    owner_username: String,
    model_name: String,
    extraction_model_ids: Vec<Uuid>,
}

async fn knowledge_extraction(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<KnowledgeExtractionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let data = register_composite(
        &state,
        &req.owner_username,
        &req.model_name,
        ModelType::KnowledgeExtraction,
        &req.extraction_model_ids,
    )
    .await?;
    Ok(Envelope::ok("knowledge-extraction workflow created", data))
}

#[derive(Debug, Deserialize)]
struct CreateWorkflowRequest {
    owner_username: String,
    model_name: String,
    model_type: ModelType,
    dependency_ids: Vec<Uuid>,
}

async fn create(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<CreateWorkflowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let data = register_composite(
        &state,
        &req.owner_username,
        &req.model_name,
        req.model_type,
        &req.dependency_ids,
    )
    .await?;
    Ok(Envelope::ok("workflow created", data))
}

#[derive(Debug, Deserialize)]
struct AddModelsRequest {
    model_id: Uuid,
    dependency_ids: Vec<Uuid>,
}

async fn add_models(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<AddModelsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    for dependency_id in &req.dependency_ids {
        repository::get_model(&state.pool, *dependency_id).await?;
        repository::add_dependency(&state.pool, req.model_id, *dependency_id).await?;
    }
    Ok(Envelope::<()>::accepted("dependencies added"))
}

#[derive(Debug, Deserialize)]
struct DeleteModelsRequest {
    model_id: Uuid,
    dependency_ids: Vec<Uuid>,
}

async fn delete_models(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<DeleteModelsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    for dependency_id in &req.dependency_ids {
        repository::remove_dependency(&state.pool, req.model_id, *dependency_id).await?;
    }
    Ok(Envelope::<()>::accepted("dependencies removed"))
}

#[derive(Debug, Deserialize)]
struct ModelIdRequest {
    model_id: Uuid,
}

async fn start(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<ModelIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let model = repository::get_model(&state.pool, req.model_id).await?;
    let deployment = state
        .lifecycle
        .deploy_run(req.model_id, &model.model_name, false, None)
        .await?;
    Ok(Envelope::ok(
        "workflow started",
        serde_json::json!({ "deployment_id": deployment.id, "status": deployment.status }),
    ))
}

async fn stop(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<ModelIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle.undeploy(req.model_id).await?;
    Ok(Envelope::<()>::accepted("workflow stopped"))
}

async fn validate(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<ModelIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let dependencies = repository::list_dependencies(&state.pool, req.model_id).await?;
    let untrained: Vec<Uuid> = dependencies
        .iter()
        .filter(|d| d.train_status != TrainStatus::Complete)
        .map(|d| d.id)
        .collect();

    Ok(Envelope::ok(
        "ok",
        serde_json::json!({ "valid": untrained.is_empty(), "untrained_dependencies": untrained }),
    ))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<ModelIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle.delete_model(req.model_id).await?;
    Ok(Envelope::<()>::accepted("workflow deleted"))
}

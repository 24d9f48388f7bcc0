//! `train/*` routes (§6): job submission (`train/ndb`, `train/udt`), the
//! training-process callbacks, and the read-only status/logs endpoints.

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use platform_auth::AuthzToken;
use platform_entities::models::{ModelType, TrainStatus};
use platform_entities::repository;
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::middleware::require_task_runner;
use crate::state::AppState;

/// Routes requiring `write` permission: submitting a training job.
pub fn write_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/train/ndb", post(train_ndb))
        .route("/train/udt", post(train_udt))
}

/// Routes requiring `read` permission: polling status/logs.
pub fn read_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/train/status", get(train_status))
        .route("/train/logs", get(train_logs))
}

/// Routes authenticated by the shared task-runner token rather than the
/// permission cache — called only by the training process itself (§4.4
/// actor 2: "Training/deployment processes reporting back via
/// authenticated callbacks").
pub fn callback_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/train/complete", post(train_complete))
        .route("/train/update-status", post(train_update_status))
}

#[derive(Debug, Deserialize)]
struct ModelOptions {
    model_name: String,
    parent_id: Option<Uuid>,
    #[serde(default)]
    model_type: Option<ModelType>,
    subtype: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct JobOptions {
    #[serde(default)]
    memory_mb: Option<i32>,
}

/// Pulls `model_options`/`job_options` JSON text fields and every `files`
/// part out of a `train/ndb`/`train/udt` multipart body (§6: "multipart:
/// files + JSON fields `file_info`, `model_options`, `job_options`"). The
/// uploaded files themselves are opaque training input — the control
/// plane only stages them under the model's data directory for the
/// training process to pick up (§3: "The control plane never reads the
/// artifact").
struct TrainUpload {
    model_options: ModelOptions,
    job_options: JobOptions,
    files: Vec<(String, Vec<u8>)>,
}

async fn parse_train_upload(mut multipart: Multipart) -> Result<TrainUpload, ApiError> {
    let mut model_options: Option<ModelOptions> = None;
    let mut job_options = JobOptions::default();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("model_options") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                model_options = Some(
                    serde_json::from_str(&text)
                        .map_err(|e| ApiError::BadRequest(format!("invalid model_options: {e}")))?,
                );
            }
            Some("job_options") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                job_options = serde_json::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(format!("invalid job_options: {e}")))?;
            }
            Some("file_info") => {
                // Accepted and ignored beyond validating it parses — the
                // per-file metadata it carries is consumed by the training
                // process itself, not the control plane (§1, §3).
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                let _: serde_json::Value = serde_json::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(format!("invalid file_info: {e}")))?;
            }
            Some("files") => {
                let filename = field.file_name().unwrap_or("upload").to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                files.push((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let model_options = model_options
        .ok_or_else(|| ApiError::BadRequest("missing model_options field".to_owned()))?;

    Ok(TrainUpload {
        model_options,
        job_options,
        files,
    })
}

async fn stage_uploaded_files(
    state: &AppState,
    model_id: Uuid,
    files: &[(String, Vec<u8>)],
) -> Result<(), ApiError> {
    if files.is_empty() {
        return Ok(());
    }
    let dir = state
        .config
        .bazaar_dir
        .join("data")
        .join(model_id.to_string())
        .join("unsupervised");
    tokio::fs::create_dir_all(&dir).await?;
    for (name, bytes) in files {
        tokio::fs::write(dir.join(name), bytes).await?;
    }
    Ok(())
}

async fn train_ndb(
    State(state): State<Arc<AppState>>,
    Extension(authz): Extension<AuthzToken>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = parse_train_upload(multipart).await?;

    let model = state
        .lifecycle
        .train_ndb(&authz.username, &upload.model_options.model_name, upload.model_options.parent_id)
        .await?;

    stage_uploaded_files(&state, model.id, &upload.files).await?;
    let _ = upload.job_options;

    Ok(Envelope::ok(
        "training job submitted",
        serde_json::json!({ "model_id": model.id, "train_status": model.train_status }),
    ))
}

async fn train_udt(
    State(state): State<Arc<AppState>>,
    Extension(authz): Extension<AuthzToken>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = parse_train_upload(multipart).await?;

    let model_type = upload
        .model_options
        .model_type
        .ok_or_else(|| ApiError::BadRequest("model_options.model_type is required for train/udt".to_owned()))?;
    if !matches!(model_type, ModelType::NlpText | ModelType::NlpToken) {
        return Err(ApiError::BadRequest(
            "train/udt model_type must be nlp-text or nlp-token".to_owned(),
        ));
    }

    let model = state
        .lifecycle
        .train_udt(
            &authz.username,
            &upload.model_options.model_name,
            model_type,
            upload.model_options.subtype.as_deref(),
            upload.model_options.parent_id,
        )
        .await?;

    stage_uploaded_files(&state, model.id, &upload.files).await?;
    let _ = upload.job_options;

    Ok(Envelope::ok(
        "training job submitted",
        serde_json::json!({ "model_id": model.id, "train_status": model.train_status }),
    ))
}

#[derive(Debug, Deserialize)]
struct ModelIdQuery {
    model_id: Uuid,
}

async fn train_status(
    State(state): State<Arc<AppState>>,
    Query(req): Query<ModelIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let model = repository::get_model(&state.pool, req.model_id).await?;
    Ok(Envelope::ok(
        "ok",
        serde_json::json!({ "model_id": model.id, "train_status": model.train_status }),
    ))
}

#[derive(Debug, Deserialize)]
struct TrainLogsQuery {
    model_id: Uuid,
    #[serde(default = "default_log_lines")]
    lines: usize,
}

fn default_log_lines() -> usize {
    platform_core::logs::DEFAULT_TAIL_LINES
}

async fn train_logs(
    State(state): State<Arc<AppState>>,
    Query(req): Query<TrainLogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let lines = platform_core::logs::tail_train_log(&state.config.bazaar_dir, req.model_id, req.lines).await?;
    Ok(Envelope::ok("ok", serde_json::json!({ "lines": lines })))
}

#[derive(Debug, Deserialize)]
struct TrainCallbackRequest {
    model_id: Uuid,
    status: TrainStatus,
}

async fn train_complete(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(req): Json<TrainCallbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_task_runner(&state, &headers)?;
    let model = state.lifecycle.train_complete(req.model_id, req.status).await?;
    Ok(Envelope::ok(
        "train status recorded",
        serde_json::json!({ "model_id": model.id, "train_status": model.train_status }),
    ))
}

async fn train_update_status(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(req): Json<TrainCallbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_task_runner(&state, &headers)?;
    let model = state.lifecycle.train_complete(req.model_id, req.status).await?;
    Ok(Envelope::ok(
        "train status updated",
        serde_json::json!({ "model_id": model.id, "train_status": model.train_status }),
    ))
}

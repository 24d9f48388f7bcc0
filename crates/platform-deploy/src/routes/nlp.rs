//! NLP text/token deployment routes (§6's "NLP text/token" route group).
//!
//! Inference itself is out of scope (§10 — "no reimplementation of …
//! inference"); `predict` returns an empty prediction set rather than a
//! fabricated model output. What this module owns is the sample/label
//! bookkeeping contract around a deployed NLP model.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use platform_core::updatelog::LogKind;
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::AppError;
use crate::mutation::{self, Outcome};
use crate::state::{AppState, NlpSample};

/// Non-mutating routes (§4.7 step 5 — wrapped with `read`).
pub fn read_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/predict", post(predict))
        .route("/get_recent_samples", get(get_recent_samples))
        .route("/get_labels", get(get_labels))
        .route("/stats", get(stats))
}

/// Mutating routes (§4.7 step 5 — wrapped with `write`).
pub fn write_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/insert_sample", post(insert_sample))
        .route("/add_labels", post(add_labels))
}

#[derive(Debug, Deserialize, serde::Serialize)]
pub struct PredictRequest {
    pub inputs: Vec<String>,
}

/// One entity a token-classification guardrail model would have detected,
/// in the shape `crate::redaction::DetectedEntity` consumes.
#[derive(Debug, serde::Serialize, Deserialize)]
pub struct PredictedEntity {
    pub start: usize,
    pub end: usize,
    pub tag: String,
}

#[derive(Debug, serde::Serialize, Deserialize)]
pub struct PredictResult {
    pub input: String,
    pub label: Option<String>,
    pub entities: Vec<PredictedEntity>,
}

/// Stub prediction — real inference is out of scope for this deployment
/// runtime. Returns one empty result per input so callers (including the
/// enterprise-search composition) get a well-shaped response to route on.
async fn predict(Json(req): Json<PredictRequest>) -> Json<Vec<PredictResult>> {
    Json(
        req.inputs
            .into_iter()
            .map(|input| PredictResult {
                input,
                label: None,
                entities: Vec::new(),
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
pub struct InsertSampleRequest {
    pub input: String,
    pub label: String,
}

async fn insert_sample(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InsertSampleRequest>,
) -> Result<axum::response::Response, AppError> {
    let sample = NlpSample {
        id: Uuid::new_v4(),
        input: req.input,
        label: req.label,
        created_at: Utc::now(),
    };

    let outcome = mutation::route(
        &state,
        LogKind::Insertions,
        "insert_sample",
        serde_json::json!({ "input": sample.input, "label": sample.label }),
    )
    .await?;

    match outcome {
        Outcome::ApplyInProcess => {
            let _guard = state.mutation_lock.lock().await;
            let id = sample.id;
            state.nlp_state.lock().push_sample(sample);
            Ok(Envelope::ok("inserted", serde_json::json!({ "id": id })).into_response())
        }
        Outcome::Logged => Ok(Envelope::<()>::accepted("sample queued").into_response()),
    }
}

async fn get_recent_samples(State(state): State<Arc<AppState>>) -> Json<Vec<NlpSample>> {
    let nlp = state.nlp_state.lock();
    Json(nlp.samples.iter().cloned().collect())
}

#[derive(Debug, Deserialize)]
pub struct AddLabelsRequest {
    pub labels: Vec<String>,
}

async fn add_labels(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddLabelsRequest>,
) -> impl IntoResponse {
    let mut nlp = state.nlp_state.lock();
    for label in req.labels {
        if !nlp.labels.contains(&label) {
            nlp.labels.push(label);
        }
    }
    Envelope::ok("ok", serde_json::json!({ "labels": nlp.labels.clone() }))
}

async fn get_labels(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.nlp_state.lock().labels.clone())
}

async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let nlp = state.nlp_state.lock();
    Envelope::ok(
        "ok",
        serde_json::json!({
            "recent_sample_count": nlp.samples.len(),
            "label_count": nlp.labels.len(),
        }),
    )
}

//! Enterprise-search deployment routes (§6's "Enterprise-search" group,
//! §4.7's "Enterprise-search composition").
//!
//! `search` fans out to a dependency NDB deployment, then (if a guardrail
//! dependency is configured) to a dependency NLP deployment's `/predict`
//! to redact PII in the query and every reference text. `/unredact`
//! inverts a client-supplied `(text, label_map)` pair.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::AppError;
use crate::redaction::{DetectedEntity, LabelMap};
use crate::routes::ndb::SearchHit;
use crate::routes::nlp::{PredictRequest, PredictResult};
use crate::state::AppState;

/// Both routes are non-mutating (§4.7 step 5 — wrapped with `read`); this
/// composition has no write surface of its own.
pub fn read_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search", post(search))
        .route("/unredact", post(unredact))
}

pub fn write_router() -> Router<Arc<AppState>> {
    Router::new()
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct RedactedHit {
    pub id: uuid::Uuid,
    pub source: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<RedactedHit>,
    /// The label map used for this query's redactions — replay it back
    /// into `/unredact` to recover the original text.
    pub label_map: LabelMap,
}

async fn call_dependency_predict(
    state: &AppState,
    base_url: &str,
    inputs: Vec<String>,
) -> Result<Vec<PredictResult>, AppError> {
    let resp = state
        .http
        .post(format!("{base_url}/predict"))
        .json(&PredictRequest { inputs })
        .send()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(AppError::Upstream(format!(
            "guardrail dependency returned {}",
            resp.status()
        )));
    }

    resp.json()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))
}

async fn call_dependency_search(
    state: &AppState,
    base_url: &str,
    query: &str,
    top_k: usize,
) -> Result<Vec<SearchHit>, AppError> {
    let resp = state
        .http
        .post(format!("{base_url}/search"))
        .json(&serde_json::json!({ "query": query, "top_k": top_k }))
        .send()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(AppError::Upstream(format!(
            "NDB dependency returned {}",
            resp.status()
        )));
    }

    resp.json()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))
}

fn to_detected(result: &PredictResult) -> Vec<DetectedEntity> {
    result
        .entities
        .iter()
        .map(|e| DetectedEntity {
            start: e.start,
            end: e.end,
            tag: e.tag.clone(),
        })
        .collect()
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ndb_url = state
        .config
        .ndb_dependency_url
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("no NDB dependency configured".to_owned()))?;

    let hits = call_dependency_search(&state, ndb_url, &req.query, req.top_k).await?;

    let mut label_map = LabelMap::new();
    let mut redacted_query = req.query.clone();
    let mut results: Vec<RedactedHit> = hits
        .into_iter()
        .map(|h| RedactedHit {
            id: h.id,
            source: h.source,
            text: h.text,
            score: h.score,
        })
        .collect();

    if let Some(guardrail_url) = state.config.guardrail_dependency_url.as_deref() {
        let mut inputs = vec![req.query.clone()];
        inputs.extend(results.iter().map(|r| r.text.clone()));

        let predictions = call_dependency_predict(&state, guardrail_url, inputs).await?;

        let mut predictions = predictions.into_iter();
        if let Some(query_prediction) = predictions.next() {
            redacted_query = label_map.redact(&req.query, to_detected(&query_prediction));
        }
        for (result, prediction) in results.iter_mut().zip(predictions) {
            result.text = label_map.redact(&result.text, to_detected(&prediction));
        }
    }

    Ok(Envelope::ok(
        "ok",
        SearchResponse {
            query: redacted_query,
            results,
            label_map,
        },
    ))
}

#[derive(Debug, Deserialize)]
pub struct UnredactRequest {
    pub text: String,
    pub label_map: LabelMap,
}

async fn unredact(Json(req): Json<UnredactRequest>) -> impl IntoResponse {
    let restored = req.label_map.unredact(&req.text);
    Envelope::ok("ok", serde_json::json!({ "text": restored }))
}

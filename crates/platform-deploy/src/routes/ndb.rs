//! NDB deployment routes (§6's "NDB" route group).
//!
//! The retrieval engine itself is out of scope (§10 — "no reimplementation
//! of … retrieval"); this module implements the request/response contract
//! and the write-path branching (§4.7 step 4), backing `search`/`sources`
//! with a minimal in-process document list rather than a real vector index.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use platform_auth::AuthzToken;
use platform_core::updatelog::LogKind;
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::AppError;
use crate::mutation::{self, Outcome};
use crate::state::{AppState, NdbDocument};

/// Non-mutating routes (§4.7 step 5 — wrapped with `read`).
pub fn read_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search", post(search))
        .route("/sources", get(sources))
        .route("/pdf-blob", get(pdf_blob))
        .route("/pdf-chunks", get(pdf_chunks))
        .route("/highlighted-pdf", get(highlighted_pdf))
        .route("/get-chat-history", post(get_chat_history))
}

/// Mutating routes (§4.7 step 5 — wrapped with `write`).
pub fn write_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/insert", post(insert))
        .route("/delete", post(delete))
        .route("/upvote", post(upvote))
        .route("/associate", post(associate))
        .route("/implicit-feedback", post(implicit_feedback))
        .route("/save", post(save))
        .route("/chat", post(chat))
        .route("/update-chat-settings", post(update_chat_settings))
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

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Naive substring-overlap ranking. Standing in for the real retriever,
/// which this deployment type's algorithms are explicitly out of scope for.
pub fn rank(documents: &[NdbDocument], query: &str, top_k: usize) -> Vec<SearchHit> {
    let query_lower = query.to_lowercase();
    let terms: Vec<&str> = query_lower.split_whitespace().collect();

    let mut hits: Vec<SearchHit> = documents
        .iter()
        .map(|doc| {
            let text_lower = doc.text.to_lowercase();
            let score = terms
                .iter()
                .filter(|t| text_lower.contains(**t))
                .count();
            SearchHit {
                id: doc.id,
                text: doc.text.clone(),
                source: doc.source.clone(),
                score: score as f32,
            }
        })
        .filter(|hit| hit.score > 0.0)
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(top_k);
    hits
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Json<Vec<SearchHit>> {
    let docs = state.ndb_index.lock();
    Json(rank(&docs.documents, &req.query, req.top_k))
}

#[derive(Debug, Deserialize)]
pub struct InsertRequest {
    pub source: String,
    pub text: String,
}

async fn insert(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InsertRequest>,
) -> Result<axum::response::Response, AppError> {
    let doc = NdbDocument {
        id: Uuid::new_v4(),
        source: req.source,
        text: req.text,
        upvotes: 0,
    };

    let outcome = mutation::route(
        &state,
        LogKind::Insertions,
        "insert",
        serde_json::to_value(&doc).unwrap_or_default(),
    )
    .await?;

    match outcome {
        Outcome::ApplyInProcess => {
            let _guard = state.mutation_lock.lock().await;
            let id = doc.id;
            state.ndb_index.lock().documents.push(doc);
            Ok(Envelope::ok("inserted", serde_json::json!({ "id": id })).into_response())
        }
        Outcome::Logged => Ok(Envelope::<()>::accepted("insert queued").into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub id: Uuid,
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteRequest>,
) -> Result<axum::response::Response, AppError> {
    let outcome = mutation::route(
        &state,
        LogKind::Deletions,
        "delete",
        serde_json::json!({ "id": req.id }),
    )
    .await?;

    match outcome {
        Outcome::ApplyInProcess => {
            let _guard = state.mutation_lock.lock().await;
            state.ndb_index.lock().documents.retain(|d| d.id != req.id);
            Ok(Envelope::ok("deleted", serde_json::json!({ "id": req.id })).into_response())
        }
        Outcome::Logged => Ok(Envelope::<()>::accepted("delete queued").into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpvoteRequest {
    pub query: String,
    pub chunk_id: Uuid,
}

async fn upvote(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpvoteRequest>,
) -> Result<axum::response::Response, AppError> {
    feedback(&state, "upvote", serde_json::json!({ "query": req.query, "chunk_id": req.chunk_id }), req.chunk_id).await
}

#[derive(Debug, Deserialize)]
pub struct AssociateRequest {
    pub source_query: String,
    pub target_query: String,
    pub chunk_id: Uuid,
}

async fn associate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssociateRequest>,
) -> Result<axum::response::Response, AppError> {
    feedback(
        &state,
        "associate",
        serde_json::json!({
            "source_query": req.source_query,
            "target_query": req.target_query,
            "chunk_id": req.chunk_id,
        }),
        req.chunk_id,
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct ImplicitFeedbackRequest {
    pub query: String,
    pub chunk_id: Uuid,
}

async fn implicit_feedback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImplicitFeedbackRequest>,
) -> Result<axum::response::Response, AppError> {
    feedback(
        &state,
        "implicit_upvote",
        serde_json::json!({ "query": req.query, "chunk_id": req.chunk_id }),
        req.chunk_id,
    )
    .await
}

async fn feedback(
    state: &AppState,
    op: &str,
    payload: serde_json::Value,
    chunk_id: Uuid,
) -> Result<axum::response::Response, AppError> {
    let outcome = mutation::route(state, LogKind::Feedback, op, payload).await?;
    match outcome {
        Outcome::ApplyInProcess => {
            let _guard = state.mutation_lock.lock().await;
            let mut index = state.ndb_index.lock();
            if let Some(doc) = index.documents.iter_mut().find(|d| d.id == chunk_id) {
                doc.upvotes += 1;
            }
            Ok(Envelope::ok("feedback recorded", serde_json::json!({})).into_response())
        }
        Outcome::Logged => Ok(Envelope::<()>::accepted("feedback queued").into_response()),
    }
}

#[derive(Debug, serde::Serialize)]
struct SourceEntry {
    id: Uuid,
    source: String,
}

async fn sources(State(state): State<Arc<AppState>>) -> Json<Vec<SourceEntry>> {
    let docs = state.ndb_index.lock();
    Json(
        docs.documents
            .iter()
            .map(|d| SourceEntry {
                id: d.id,
                source: d.source.clone(),
            })
            .collect(),
    )
}

async fn save(
    State(state): State<Arc<AppState>>,
    _authz: Extension<AuthzToken>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let dest = state
        .config
        .bazaar_dir
        .join("models")
        .join(state.config.model_id.to_string())
        .join("model.ndb.saved");
    tokio::fs::create_dir_all(&dest).await?;
    Ok(Envelope::ok(
        "saved",
        serde_json::json!({ "path": dest.display().to_string() }),
    ))
}

async fn pdf_blob() -> Result<(), AppError> {
    Err(AppError::NotFound("pdf storage is not populated by this deployment".to_owned()))
}

async fn pdf_chunks() -> Result<(), AppError> {
    Err(AppError::NotFound("pdf storage is not populated by this deployment".to_owned()))
}

async fn highlighted_pdf() -> Result<(), AppError> {
    Err(AppError::NotFound("pdf storage is not populated by this deployment".to_owned()))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Uuid,
    pub message: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let reply = {
        let docs = state.ndb_index.lock();
        let hits = rank(&docs.documents, &req.message, 3);
        if hits.is_empty() {
            "No relevant sources found.".to_owned()
        } else {
            format!("Based on {} source(s): {}", hits.len(), hits[0].text)
        }
    };

    crate::chat::append_turn(&state, req.session_id, "user", &req.message).await?;
    crate::chat::append_turn(&state, req.session_id, "assistant", &reply).await?;

    Ok(Envelope::ok(
        "ok",
        serde_json::json!({ "session_id": req.session_id, "reply": reply }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateChatSettingsRequest {
    pub session_id: Uuid,
    pub system_prompt: Option<String>,
}

async fn update_chat_settings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateChatSettingsRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    crate::chat::write_settings(&state, req.session_id, req.system_prompt.as_deref()).await?;
    Ok(Envelope::ok("ok", serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct GetChatHistoryRequest {
    pub session_id: Uuid,
}

async fn get_chat_history(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GetChatHistoryRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let turns = crate::chat::read_history(&state, req.session_id).await?;
    Ok(Envelope::ok("ok", serde_json::json!({ "turns": turns })))
}

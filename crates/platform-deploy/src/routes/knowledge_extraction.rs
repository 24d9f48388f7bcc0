//! Knowledge-extraction deployment routes (§6's "Knowledge extraction"
//! group).
//!
//! The deployment runtime never talks to Postgres directly — only
//! `platform-server`/`platform-core` touch the entity store (§0's crate
//! layout). These handlers are thin authenticated proxies onto the
//! control plane's own `/api/*` report and question endpoints; the actual
//! scoring algorithm is out of scope (§10) and lives in `platform-queue`'s
//! worker pool instead.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use reqwest::Method;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Non-mutating routes (§4.7 step 5 — wrapped with `read`).
pub fn read_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/report/{id}", get(report_get))
        .route("/reports", get(reports_list))
        .route("/questions", get(questions_list))
}

/// Mutating routes (§4.7 step 5 — wrapped with `write`).
pub fn write_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/report/create", post(report_create))
        .route("/report/{id}", delete(report_delete))
        .route("/questions", post(questions_create))
        .route("/questions/{id}", delete(questions_delete))
        .route("/questions/{id}/keywords", post(keywords_add))
}

async fn proxy(
    state: &AppState,
    method: Method,
    path: &str,
    body: Option<serde_json::Value>,
) -> Result<axum::response::Response, AppError> {
    let url = format!(
        "{}/api/{path}?model_id={}",
        state.config.control_plane_base_url, state.config.model_id
    );
    let mut builder = state.http.request(method, url);
    if let Some(body) = body {
        builder = builder.json(&body);
    }

    let resp = builder.send().await.map_err(|e| AppError::Upstream(e.to_string()))?;
    let status = resp.status();
    let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);

    Ok((
        axum::http::StatusCode::from_u16(status.as_u16()).unwrap_or(axum::http::StatusCode::BAD_GATEWAY),
        Json(body),
    )
        .into_response())
}

async fn report_create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    proxy(&state, Method::POST, "report/create", Some(body)).await
}

async fn report_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    proxy(&state, Method::GET, &format!("report/{id}"), None).await
}

async fn report_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    proxy(&state, Method::DELETE, &format!("report/{id}"), None).await
}

async fn reports_list(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    proxy(&state, Method::GET, "reports", None).await
}

async fn questions_list(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    proxy(&state, Method::GET, "questions", None).await
}

async fn questions_create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    proxy(&state, Method::POST, "questions", Some(body)).await
}

async fn questions_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    proxy(&state, Method::DELETE, &format!("questions/{id}"), None).await
}

async fn keywords_add(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    proxy(&state, Method::POST, &format!("questions/{id}/keywords"), Some(body)).await
}

//! `/health` — unauthenticated liveness probe (§6 Common routes).

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::envelope::Envelope;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

async fn health(State(_state): State<Arc<AppState>>) -> impl axum::response::IntoResponse {
    Envelope::ok("ok", serde_json::json!({}))
}

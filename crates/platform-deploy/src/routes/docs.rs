//! `/docs` — a human-readable listing of this deployment's active
//! endpoints, grounded on the teacher's `zvault-server::routes::docs` (a
//! static documentation page served from the running process rather than
//! a generated OpenAPI spec). Unlike the teacher's multi-page HTML site,
//! one deployment process only ever serves one model type, so this is a
//! single JSON listing through the usual [`Envelope`].

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::config::ModelKind;
use crate::envelope::Envelope;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/docs", get(docs))
}

fn routes_for(kind: ModelKind) -> &'static [&'static str] {
    match kind {
        ModelKind::Ndb => &[
            "POST search",
            "POST insert",
            "POST delete",
            "POST upvote",
            "POST associate",
            "POST implicit-feedback",
            "GET sources",
            "POST save",
            "GET pdf-blob",
            "GET pdf-chunks",
            "GET highlighted-pdf",
            "POST chat",
            "POST update-chat-settings",
            "POST get-chat-history",
        ],
        ModelKind::NlpText | ModelKind::NlpToken => &[
            "POST predict",
            "POST insert_sample",
            "GET get_recent_samples",
            "POST add_labels",
            "GET get_labels",
            "GET stats",
        ],
        ModelKind::EnterpriseSearch => &["POST search", "POST unredact"],
        ModelKind::KnowledgeExtraction => &[
            "POST report/create",
            "GET report/{id}",
            "DELETE report/{id}",
            "GET reports",
            "GET questions",
            "POST questions",
            "DELETE questions/{id}",
            "POST questions/{id}/keywords",
        ],
    }
}

async fn docs(State(state): State<Arc<AppState>>) -> impl axum::response::IntoResponse {
    let model_kind = state.config.model_kind;
    let mut routes: Vec<&str> = vec!["GET /health", "GET /metrics", "GET /docs"];
    routes.extend_from_slice(routes_for(model_kind));

    Envelope::ok(
        "ok",
        serde_json::json!({
            "model_id": state.config.model_id,
            "deployment_id": state.config.deployment_id,
            "model_kind": format!("{model_kind:?}"),
            "autoscaling_enabled": state.config.autoscaling_enabled,
            "routes": routes,
        }),
    )
}

//! `/metrics` — Prometheus text exposition for the control plane,
//! grounded on the teacher's `vaultrs-server::routes::metrics` and
//! mirroring `platform-deploy::routes::metrics`'s own exposition.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(prometheus_metrics))
}

async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut lines = Vec::with_capacity(8);

    let requests_total = state.metrics.requests_total.load(Ordering::Relaxed);
    let in_flight = state.metrics.in_flight.load(Ordering::Relaxed);

    lines.push("# HELP control_plane_requests_total Total requests handled.".to_owned());
    lines.push("# TYPE control_plane_requests_total counter".to_owned());
    lines.push(format!("control_plane_requests_total {requests_total}"));

    lines.push(
        "# HELP control_plane_requests_in_flight Requests currently being handled.".to_owned(),
    );
    lines.push("# TYPE control_plane_requests_in_flight gauge".to_owned());
    lines.push(format!("control_plane_requests_in_flight {in_flight}"));

    let body = lines.join("\n") + "\n";
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

//! `/metrics` — Prometheus text exposition (§4.7, `SPEC_FULL.md` C7
//! supplement), grounded on the teacher's
//! `vaultrs-server::routes::metrics`.

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
    let mut lines = Vec::with_capacity(16);

    let requests_total = state.metrics.requests_total.load(Ordering::Relaxed);
    let in_flight = state.metrics.in_flight.load(Ordering::Relaxed);

    lines.push("# HELP deployment_requests_total Total requests handled.".to_owned());
    lines.push("# TYPE deployment_requests_total counter".to_owned());
    lines.push(format!("deployment_requests_total {requests_total}"));

    lines.push("# HELP deployment_requests_in_flight Requests currently being handled.".to_owned());
    lines.push("# TYPE deployment_requests_in_flight gauge".to_owned());
    lines.push(format!("deployment_requests_in_flight {in_flight}"));

    lines.push(
        "# HELP deployment_autoscaling_enabled Whether this deployment writes to the durable update log instead of mutating in-process."
            .to_owned(),
    );
    lines.push("# TYPE deployment_autoscaling_enabled gauge".to_owned());
    lines.push(format!(
        "deployment_autoscaling_enabled {}",
        u8::from(state.config.autoscaling_enabled)
    ));

    let body = lines.join("\n") + "\n";
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

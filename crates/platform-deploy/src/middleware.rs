//! Request-permission enforcement and audit logging middleware (§4.7 steps
//! 5–6), composed as ordinary Axum middleware functions rather than the
//! decorator-based wiring the source used (§9 redesign flag).

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use platform_auth::{require_read, require_write, resolve_credential, AuthzToken};
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

fn extract_credential(req: &Request<Body>) -> Option<String> {
    let api_key = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    let bearer = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());
    resolve_credential(api_key, bearer).map(str::to_owned)
}

/// Wraps a route requiring `read` permission. Injects [`AuthzToken`] into
/// request extensions on success.
///
/// # Errors
///
/// Returns [`AppError::Unauthorized`] if no credential is presented, or
/// whatever [`platform_auth::require_read`] returns otherwise.
pub async fn require_read_mw(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = extract_credential(&req) else {
        return Err(AppError::Unauthorized("missing credential".to_owned()));
    };
    let authz = require_read(&state.permission_cache, &token).await?;
    req.extensions_mut().insert(authz);
    Ok(next.run(req).await)
}

/// Wraps a route requiring `write` permission. Mirrors
/// [`require_read_mw`] but for mutating routes.
///
/// # Errors
///
/// Returns [`AppError::Unauthorized`]/[`AppError::Forbidden`] as above.
pub async fn require_write_mw(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = extract_credential(&req) else {
        return Err(AppError::Unauthorized("missing credential".to_owned()));
    };
    let authz: AuthzToken = require_write(&state.permission_cache, &token).await?;
    req.extensions_mut().insert(authz);
    Ok(next.run(req).await)
}

/// Logs request metadata (ip, url, query, resolved username) to the audit
/// stream, skipping `/metrics` (§4.7 step 6). Also drives the per-request
/// counters backing `/metrics` and resets the idle timer on every request.
pub async fn audit_and_metrics_mw(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    state.idle_reset.notify_one();

    let path = req.uri().path().to_owned();
    let query = req.uri().query().unwrap_or("").to_owned();
    let skip_audit = path == "/metrics";

    if !skip_audit {
        state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);
        state.metrics.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    let username = req
        .extensions()
        .get::<AuthzToken>()
        .map(|a| a.username.clone());

    let response = next.run(req).await;

    if !skip_audit {
        state.metrics.in_flight.fetch_sub(1, Ordering::Relaxed);
        info!(
            target: "audit",
            path = %path,
            query = %query,
            username = username.as_deref().unwrap_or("anonymous"),
            status = response.status().as_u16(),
            "deployment request"
        );
    }

    response
}

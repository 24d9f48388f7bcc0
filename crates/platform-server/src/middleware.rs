//! Request-permission enforcement and audit logging middleware, composed
//! as ordinary Axum middleware functions rather than the decorator-based
//! wiring the source used (§9 redesign flag), mirroring
//! `platform-deploy::middleware`.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use platform_auth::{require_override, require_read, require_write, resolve_credential, AuthzToken};
use platform_entities::repository;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the shared secret training/deployment processes
/// present on their callback requests (`train/complete`,
/// `train/update-status`, `deploy/complete`, `deploy/log`) — a distinct
/// credential from the permission-cache-backed API key/bearer token,
/// since these callers have no team membership of their own.
pub const TASK_RUNNER_HEADER: &str = "x-task-runner-token";

/// Authenticate a training/deployment process callback against the
/// configured shared secret (`SPEC_FULL.md` §1: "callback requests ...
/// are authenticated by a static shared-secret header, not the
/// permission cache").
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] if the header is missing or does
/// not match.
pub fn require_task_runner(
    state: &AppState,
    headers: &axum::http::HeaderMap,
) -> Result<(), ApiError> {
    let presented = headers
        .get(TASK_RUNNER_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented == Some(state.config.task_runner_token.as_str()) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized(
            "missing or invalid task runner token".to_owned(),
        ))
    }
}

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
/// Returns [`ApiError::Unauthorized`] if no credential is presented, or
/// whatever [`platform_auth::require_read`] returns otherwise.
pub async fn require_read_mw(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_credential(&req) else {
        return Err(ApiError::Unauthorized("missing credential".to_owned()));
    };
    let authz = require_read(&state.permission_cache, &token).await?;
    req.extensions_mut().insert(authz);
    Ok(next.run(req).await)
}

/// Wraps a route requiring `write` permission.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`]/[`ApiError::Forbidden`] as above.
pub async fn require_write_mw(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_credential(&req) else {
        return Err(ApiError::Unauthorized("missing credential".to_owned()));
    };
    let authz: AuthzToken = require_write(&state.permission_cache, &token).await?;
    req.extensions_mut().insert(authz);
    Ok(next.run(req).await)
}

/// Wraps a route requiring `override` permission (global-admin operations:
/// `user/add-global-admin`, `user/delete-user`, cross-owner
/// `model/update-access-level`, ...).
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`]/[`ApiError::Forbidden`] as above.
pub async fn require_override_mw(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_credential(&req) else {
        return Err(ApiError::Unauthorized("missing credential".to_owned()));
    };
    let authz: AuthzToken = require_override(&state.permission_cache, &token).await?;
    req.extensions_mut().insert(authz);
    Ok(next.run(req).await)
}

/// Logs request metadata to the audit stream, skipping `/metrics` and
/// `/health` (§4.7 step 6, applied the same way at the control-plane
/// layer). Also drives the per-request counters backing `/metrics`.
pub async fn audit_and_metrics_mw(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    let query = req.uri().query().unwrap_or("").to_owned();
    let skip_audit = path == "/metrics" || path == "/health";

    if !skip_audit {
        state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);
        state.metrics.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    let username = req
        .extensions()
        .get::<AuthzToken>()
        .map(|a| a.username.clone());
    let user_id = req
        .extensions()
        .get::<AuthzToken>()
        .and_then(|a| a.token.split('_').next())
        .map(str::to_owned);
    let _ = user_id;

    let response = next.run(req).await;

    if !skip_audit {
        state.metrics.in_flight.fetch_sub(1, Ordering::Relaxed);
        info!(
            target: "audit",
            path = %path,
            query = %query,
            username = username.as_deref().unwrap_or("anonymous"),
            status = response.status().as_u16(),
            "control plane request"
        );

        let pool = state.pool.clone();
        let action = path.clone();
        let resource = path;
        let detail = serde_json::json!({ "query": query, "status": response.status().as_u16() });
        tokio::spawn(async move {
            let _ = repository::record_audit_entry(
                &pool, None, &action, &resource, detail, None, None,
            )
            .await;
        });
    }

    response
}

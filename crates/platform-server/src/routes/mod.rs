//! HTTP route handlers for the control plane, organized by subsystem,
//! matching the teacher's `zvault-server::routes` convention. Each
//! submodule exposes the `Router<Arc<AppState>>` sub-groups its routes
//! belong to — `public_router`, `read_router`, `write_router`,
//! `override_router`, `callback_router` — and this module composes them
//! under the matching permission-enforcement middleware.

use std::sync::Arc;

use axum::middleware as axum_mw;
use axum::Router;

use crate::middleware::{audit_and_metrics_mw, require_override_mw, require_read_mw, require_write_mw};
use crate::state::AppState;

pub mod deploy;
pub mod health;
pub mod metrics;
pub mod model;
pub mod recovery;
pub mod team;
pub mod train;
pub mod user;
pub mod vault;
pub mod workflow;

/// Build the full control-plane router, mounting every permission tier
/// behind its own middleware and wrapping the whole thing in the
/// audit/metrics layer (§4.7 step 6, applied identically here).
pub fn build(state: Arc<AppState>) -> Router {
    let common = Router::new()
        .merge(health::router())
        .merge(metrics::router())
        .merge(user::public_router());

    let read_routes = Router::new()
        .merge(train::read_router())
        .merge(deploy::read_router())
        .merge(model::read_router())
        .merge(vault::read_router());

    let write_routes = Router::new()
        .merge(train::write_router())
        .merge(deploy::write_router())
        .merge(model::write_router())
        .merge(team::write_router())
        .merge(vault::write_router())
        .merge(workflow::write_router());

    let override_routes = Router::new()
        .merge(user::override_router())
        .merge(team::override_router())
        .merge(recovery::override_router());

    // Callbacks from training/deployment processes carry their own
    // shared-secret authentication inline (`middleware::require_task_runner`)
    // rather than the permission-cache middleware, since the caller has no
    // team membership of its own.
    let callback_routes = Router::new().merge(train::callback_router()).merge(deploy::callback_router());

    let authorized = Router::new()
        .merge(read_routes.route_layer(axum_mw::from_fn_with_state(Arc::clone(&state), require_read_mw)))
        .merge(write_routes.route_layer(axum_mw::from_fn_with_state(Arc::clone(&state), require_write_mw)))
        .merge(
            override_routes
                .route_layer(axum_mw::from_fn_with_state(Arc::clone(&state), require_override_mw)),
        );

    Router::new()
        .merge(common)
        .merge(authorized)
        .merge(callback_routes)
        .layer(axum_mw::from_fn_with_state(Arc::clone(&state), audit_and_metrics_mw))
        .with_state(state)
}

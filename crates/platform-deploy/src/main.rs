//! Entry point for the per-deployment inference runtime (C7, spec.md
//! §4.7), matching the teacher's `zvault-server::main` bootstrap shape:
//! load configuration once, initialize structured logging, build shared
//! state, spawn background workers, serve.

use std::sync::Arc;

use platform_scheduler::SchedulerClient;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::DeployConfig;
use crate::state::AppState;

mod chat;
mod config;
mod envelope;
mod error;
mod idle;
mod middleware;
mod mutation;
mod redaction;
mod routes;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DeployConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    info!(
        model_id = %config.model_id,
        deployment_id = %config.deployment_id,
        model_kind = ?config.model_kind,
        "deployment runtime starting"
    );

    let scheduler_base_url =
        std::env::var("SCHEDULER_BASE_URL").unwrap_or_else(|_| "http://scheduler.internal".to_owned());
    let scheduler = SchedulerClient::new(scheduler_base_url)?;

    let state = Arc::new(AppState::new(config));

    {
        let state = Arc::clone(&state);
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            idle::run_forever(state, scheduler).await;
        });
    }

    let bind_addr = state.config.bind_addr;
    let app = routes::build(Arc::clone(&state));

    let listener = match TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "failed to bind, reporting failed status");
            report_failed(&state, &e.to_string()).await;
            return Err(e.into());
        }
    };

    info!(addr = %bind_addr, "deployment runtime listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server error, reporting failed status");
        report_failed(&state, &e.to_string()).await;
        return Err(e.into());
    }

    Ok(())
}

/// Final `deploy/update-status(failed)` callback on unrecoverable startup
/// or serve failure (§6's exit-code contract: "non-zero on unhandled
/// exception after attempting one final `update-status(failed)`
/// callback").
async fn report_failed(state: &AppState, message: &str) {
    let resp = state
        .http
        .post(format!(
            "{}/api/deploy/update-status",
            state.config.control_plane_base_url
        ))
        .json(&serde_json::json!({
            "deployment_id": state.config.deployment_id,
            "status": "failed",
            "message": message,
        }))
        .send()
        .await;

    if let Err(e) = resp {
        warn!(error = %e, "failed to report final failed status to control plane");
    }
}

//! Entry point for the control-plane HTTP API, matching the teacher's
//! `zvault-server::main` bootstrap shape: load configuration once,
//! initialize structured logging, connect the entity store, build shared
//! state, spawn background workers, serve.

use std::sync::Arc;

use platform_scheduler::SchedulerClient;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::state::AppState;

mod auth;
mod config;
mod envelope;
mod error;
mod middleware;
mod routes;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    info!(bind_addr = %config.bind_addr, "control plane starting");

    let pool = platform_entities::connect(&config.database_url).await?;
    let scheduler = SchedulerClient::new(config.scheduler_base_url.clone())?;

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(config, pool.clone(), scheduler.clone())?);

    tokio::spawn(platform_core::sweeper::run_forever(pool, scheduler));

    let app = routes::build(Arc::clone(&state));

    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "control plane listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server error");
        return Err(e.into());
    }

    Ok(())
}

//! The idle shutdown timer (§4.7 step 7).
//!
//! A single-fire timer waits for [`DeployConfig::idle_timeout`] with no
//! request; every incoming request resets it. On timeout, if the control
//! plane reports zero active deployments for this model, the process stops
//! its own cluster job and reports itself stopped.

use std::sync::Arc;

use platform_scheduler::SchedulerClient;
use tracing::{info, warn};

use crate::state::AppState;

#[derive(serde::Deserialize)]
struct ActiveDeploymentsResponse {
    active_count: u32,
}

async fn active_deployment_count(state: &AppState) -> anyhow::Result<u32> {
    let resp = state
        .http
        .get(format!(
            "{}/api/model/{}/active-deployments",
            state.config.control_plane_base_url, state.config.model_id
        ))
        .send()
        .await?
        .json::<ActiveDeploymentsResponse>()
        .await?;
    Ok(resp.active_count)
}

async fn report_stopped(state: &AppState) -> anyhow::Result<()> {
    state
        .http
        .post(format!(
            "{}/api/deploy/update-status",
            state.config.control_plane_base_url
        ))
        .json(&serde_json::json!({
            "deployment_id": state.config.deployment_id,
            "status": "stopped",
        }))
        .send()
        .await?;
    Ok(())
}

/// Run the idle-timeout loop forever. Each call to `state.idle_reset`
/// postpones the deadline; reaching it without a reset triggers the
/// self-shutdown check.
pub async fn run_forever(state: Arc<AppState>, scheduler: SchedulerClient) {
    loop {
        let timed_out = tokio::select! {
            () = tokio::time::sleep(state.config.idle_timeout) => true,
            () = state.idle_reset.notified() => false,
        };

        if !timed_out {
            continue;
        }

        match active_deployment_count(&state).await {
            Ok(0) => {
                info!(
                    deployment_id = %state.config.deployment_id,
                    "idle timeout reached with zero active deployments, stopping self"
                );
                if let Some(job_id) = current_job_id(&state) {
                    if let Err(e) = scheduler.stop(&job_id).await {
                        warn!(error = %e, "idle-timer self-stop failed to reach scheduler");
                    }
                }
                if let Err(e) = report_stopped(&state).await {
                    warn!(error = %e, "idle-timer failed to report stopped status");
                }
                return;
            }
            Ok(active) => {
                info!(active, "idle timeout reached but deployment still active elsewhere");
            }
            Err(e) => {
                warn!(error = %e, "idle-timer could not reach control plane");
            }
        }
    }
}

/// The job id this process believes it is running as. In a real deployment
/// this is read once from the environment the cluster driver injected
/// (`NOMAD_ALLOC_ID`-equivalent); exposed as a function so the idle loop's
/// control flow is testable independent of environment state.
fn current_job_id(state: &AppState) -> Option<String> {
    std::env::var("JOB_ID").ok().or_else(|| {
        Some(state.config.alloc_id.to_string())
    })
}

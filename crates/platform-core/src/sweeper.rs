//! Stale in-progress sweeper (§4.4): deployments/trainings stuck in
//! `starting`/`in_progress` with no live job in the scheduler for more than
//! [`STALE_THRESHOLD_SECS`] are marked failed with `"job vanished"`.

use std::time::Duration;

use chrono::Utc;
use platform_entities::{models::DeploymentStatus, repository, PgPool};
use platform_scheduler::SchedulerClient;
use tracing::{info, warn};

/// How long a deployment may sit `starting`/`in_progress` with no
/// corresponding scheduler job before the sweeper marks it failed.
pub const STALE_THRESHOLD_SECS: i64 = 60;

/// How often the sweeper runs.
pub const SWEEP_INTERVAL_SECS: u64 = 30;

/// Run one sweep pass: list every stale-candidate deployment and, for each
/// whose scheduler job no longer exists, mark it failed.
///
/// # Errors
///
/// Propagates entity-store or scheduler errors encountered while listing
/// candidates; a per-row scheduler failure is logged and skipped rather
/// than aborting the whole sweep.
pub async fn sweep_once(
    pool: &PgPool,
    scheduler: &SchedulerClient,
) -> Result<usize, platform_entities::EntityError> {
    let cutoff = Utc::now() - chrono::Duration::seconds(STALE_THRESHOLD_SECS);
    let candidates = repository::list_stale_in_progress(pool, cutoff).await?;
    let mut marked = 0;

    for deployment in candidates {
        let Some(job_id) = &deployment.job_id else {
            continue;
        };

        let exists = match scheduler.exists(job_id).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(deployment_id = %deployment.id, error = %e, "sweeper could not reach scheduler");
                continue;
            }
        };

        if !exists {
            repository::set_deployment_status(
                pool,
                deployment.id,
                DeploymentStatus::Failed,
                None,
            )
            .await?;
            info!(deployment_id = %deployment.id, "marked failed: job vanished");
            marked += 1;
        }
    }

    Ok(marked)
}

/// Run [`sweep_once`] on a fixed interval until cancelled. Intended to be
/// spawned as a background task from `platform-server`'s `main`.
pub async fn run_forever(pool: PgPool, scheduler: SchedulerClient) {
    let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
    loop {
        interval.tick().await;
        if let Err(e) = sweep_once(&pool, &scheduler).await {
            warn!(error = %e, "stale-in-progress sweep failed");
        }
    }
}

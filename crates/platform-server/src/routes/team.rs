//! `team/*` routes (§6): team CRUD and membership management.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::{Extension, Json, Router};
use platform_auth::AuthzToken;
use platform_entities::models::TeamRole;
use platform_entities::repository;
use serde::Deserialize;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Routes requiring `write` permission (team self-service operations).
pub fn write_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/team/create-team", post(create_team))
        .route("/team/add-user-to-team", post(add_user_to_team))
        .route("/team/remove-user-from-team", delete(remove_user_from_team))
}

/// Routes requiring `override` permission (global-admin-equivalent).
pub fn override_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/team/assign-team-admin", post(assign_team_admin))
        .route("/team/delete-team", delete(delete_team))
}

#[derive(Debug, Deserialize)]
struct CreateTeamRequest {
    name: String,
}

async fn create_team(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<CreateTeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let team = repository::create_team(&state.pool, &req.name).await?;
    Ok(Envelope::ok(
        "team created",
        serde_json::json!({ "team_id": team.id, "name": team.name }),
    ))
}

#[derive(Debug, Deserialize)]
struct AddUserToTeamRequest {
    team_id: Uuid,
    user_id: Uuid,
    #[serde(default = "default_role")]
    role: TeamRole,
}

fn default_role() -> TeamRole {
    TeamRole::Member
}

async fn add_user_to_team(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<AddUserToTeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let membership = repository::add_member(&state.pool, req.team_id, req.user_id, req.role).await?;
    Ok(Envelope::ok(
        "user added to team",
        serde_json::json!({ "membership_id": membership.id }),
    ))
}

#[derive(Debug, Deserialize)]
struct RemoveUserFromTeamRequest {
    team_id: Uuid,
    user_id: Uuid,
}

async fn remove_user_from_team(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<RemoveUserFromTeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    repository::remove_member(&state.pool, req.team_id, req.user_id).await?;
    Ok(Envelope::<()>::accepted("user removed from team"))
}

#[derive(Debug, Deserialize)]
struct AssignTeamAdminRequest {
    team_id: Uuid,
    user_id: Uuid,
}

async fn assign_team_admin(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<AssignTeamAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let membership =
        repository::set_member_role(&state.pool, req.team_id, req.user_id, TeamRole::TeamAdmin).await?;
    Ok(Envelope::ok(
        "team admin assigned",
        serde_json::json!({ "membership_id": membership.id }),
    ))
}

#[derive(Debug, Deserialize)]
struct DeleteTeamRequest {
    team_id: Uuid,
}

async fn delete_team(
    State(state): State<Arc<AppState>>,
    Extension(_authz): Extension<AuthzToken>,
    Json(req): Json<DeleteTeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    repository::delete_team(&state.pool, req.team_id).await?;
    Ok(Envelope::<()>::accepted("team deleted"))
}

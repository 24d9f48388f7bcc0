use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EntityError;
use crate::models::{Team, TeamMembership, TeamRole};

/// Create a new team.
///
/// # Errors
///
/// Returns [`EntityError::Conflict`] if the name is already taken.
pub async fn create_team(pool: &PgPool, name: &str) -> Result<Team, EntityError> {
    sqlx::query_as::<_, Team>("INSERT INTO teams (name) VALUES ($1) RETURNING *")
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(|e| EntityError::from_unique_violation(e, "team"))
}

/// Add a user to a team with the given role.
///
/// # Errors
///
/// Returns [`EntityError::Conflict`] if the user is already a member.
pub async fn add_member(
    pool: &PgPool,
    team_id: Uuid,
    user_id: Uuid,
    role: TeamRole,
) -> Result<TeamMembership, EntityError> {
    sqlx::query_as::<_, TeamMembership>(
        "INSERT INTO team_memberships (team_id, user_id, role) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(team_id)
    .bind(user_id)
    .bind(role)
    .fetch_one(pool)
    .await
    .map_err(|e| EntityError::from_unique_violation(e, "team membership"))
}

/// List every team a user belongs to, with their role in each.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn list_user_teams(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<TeamMembership>, EntityError> {
    let rows = sqlx::query_as::<_, TeamMembership>(
        "SELECT * FROM team_memberships WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Look up a single membership row, if any.
///
/// # Errors
///
/// Returns [`EntityError::Database`] on a connection or query failure.
pub async fn find_membership(
    pool: &PgPool,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<Option<TeamMembership>, EntityError> {
    let row = sqlx::query_as::<_, TeamMembership>(
        "SELECT * FROM team_memberships WHERE team_id = $1 AND user_id = $2",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Remove a user's membership in a team (`team/remove-user-from-team`, §6).
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if no such membership exists.
pub async fn remove_member(pool: &PgPool, team_id: Uuid, user_id: Uuid) -> Result<(), EntityError> {
    let result = sqlx::query("DELETE FROM team_memberships WHERE team_id = $1 AND user_id = $2")
        .bind(team_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(EntityError::NotFound {
            what: "team membership",
        });
    }
    Ok(())
}

/// Promote (or demote) a member's role within a team
/// (`team/assign-team-admin`, §6).
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if no such membership exists.
pub async fn set_member_role(
    pool: &PgPool,
    team_id: Uuid,
    user_id: Uuid,
    role: TeamRole,
) -> Result<TeamMembership, EntityError> {
    sqlx::query_as::<_, TeamMembership>(
        "UPDATE team_memberships SET role = $3 WHERE team_id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(team_id)
    .bind(user_id)
    .bind(role)
    .fetch_optional(pool)
    .await?
    .ok_or(EntityError::NotFound {
        what: "team membership",
    })
}

/// Remove a team and all of its memberships (never the member users themselves).
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] if the team does not exist.
pub async fn delete_team(pool: &PgPool, team_id: Uuid) -> Result<(), EntityError> {
    let result = sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(team_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(EntityError::NotFound { what: "team" });
    }
    Ok(())
}

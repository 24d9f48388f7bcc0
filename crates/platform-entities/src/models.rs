//! Domain types stored in the entity store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered platform user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub verified: bool,
    #[serde(skip)]
    pub verification_nonce: Option<String>,
    pub global_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public-facing view of a [`User`], with secrets stripped.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub verified: bool,
    pub global_admin: bool,
}

impl From<User> for UserInfo {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            verified: u.verified,
            global_admin: u.global_admin,
        }
    }
}

/// A bearer token minted by `user/email-login`. Only the SHA-256 hash of
/// the token is ever stored; the plaintext is returned to the caller once.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserSession {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A named group of users.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A user's role within a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Member,
    TeamAdmin,
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Member => "member",
            Self::TeamAdmin => "team_admin",
        };
        write!(f, "{s}")
    }
}

/// A user's membership record within a team.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TeamMembership {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRole,
}

/// The kind of model an entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    Ndb,
    NlpText,
    NlpToken,
    EnterpriseSearch,
    KnowledgeExtraction,
}

/// Who may see a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Private,
    Protected,
    Public,
}

/// Training lifecycle status of a model (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrainStatus {
    NotStarted,
    InProgress,
    Complete,
    Failed,
}

/// A trained (or in-training) model.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Model {
    pub id: Uuid,
    pub owner_username: String,
    pub model_name: String,
    pub model_type: ModelType,
    pub subtype: Option<String>,
    pub train_status: TrainStatus,
    pub access_level: AccessLevel,
    pub parent_id: Option<Uuid>,
    pub hidden: bool,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Deployment lifecycle status (§4.4, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    NotStarted,
    Starting,
    InProgress,
    Complete,
    Stopped,
    Failed,
}

impl DeploymentStatus {
    /// Whether a deployment in this status counts as "live" for the purposes
    /// of the at-most-one-live-deployment-per-model invariant (§8).
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Starting | Self::InProgress | Self::Complete)
    }
}

/// A running or requested inference deployment of a model.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Deployment {
    pub id: Uuid,
    pub model_id: Uuid,
    pub status: DeploymentStatus,
    pub autoscaling_enabled: bool,
    pub memory_hint: Option<i32>,
    pub name: String,
    pub job_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of a knowledge-extraction report in the lease queue (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Queued,
    InProgress,
    Complete,
    Failed,
}

/// A queued or in-flight report (C6).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Report {
    pub id: Uuid,
    pub model_id: Uuid,
    pub status: ReportStatus,
    pub attempt: i32,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub documents: serde_json::Value,
    pub msg: Option<String>,
}

/// A user-submitted question associated with a model.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Question {
    pub id: Uuid,
    pub model_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A keyword extracted from or attached to a [`Question`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Keyword {
    pub id: Uuid,
    pub question_id: Uuid,
    pub text: String,
}

/// A per-team encrypted secret (§6's `vault/add-secret`, `vault/get-secret`
/// — used by C7's dependency calls and C8's LLM provider credentials).
/// `ciphertext`/`nonce` are opaque to the entity store; encryption happens
/// one layer up.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TeamSecret {
    pub id: Uuid,
    pub team_id: Uuid,
    pub key: String,
    #[serde(skip)]
    pub ciphertext: Vec<u8>,
    #[serde(skip)]
    pub nonce: Vec<u8>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: String,
    pub detail: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

//! HTTP error type for the control plane, mirroring the teacher's
//! `zvault-server::error::AppError` pattern: one sum type, one
//! `IntoResponse` impl, `From` conversions from each domain error
//! (§7's error taxonomy as a sum type, per §9's REDESIGN FLAGS).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use platform_auth::AuthError;
use platform_core::LifecycleError;
use platform_entities::EntityError;
use serde::Serialize;

/// Application-level error returned from control-plane handlers.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    LowDisk(String),
    Upstream(String),
    Internal(String),
}

#[derive(Serialize)]
struct Envelope {
    status: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            Self::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::Conflict(m) => (StatusCode::CONFLICT, m),
            Self::LowDisk(m) => (StatusCode::INSUFFICIENT_STORAGE, m),
            Self::Upstream(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };

        (
            status,
            Json(Envelope {
                status: "failed",
                message,
            }),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized(m) => Self::Unauthorized(m),
            AuthError::Forbidden(m) => Self::Forbidden(m),
            AuthError::SourceUnreachable(e) => Self::Upstream(e.to_string()),
        }
    }
}

impl From<EntityError> for ApiError {
    fn from(err: EntityError) -> Self {
        match err {
            EntityError::NotFound { .. } => Self::NotFound(err.to_string()),
            EntityError::Conflict { .. } => Self::Conflict(err.to_string()),
            EntityError::Validation { .. } => Self::BadRequest(err.to_string()),
            EntityError::Database(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Validation { .. } => Self::BadRequest(err.to_string()),
            LifecycleError::DuplicateTrain { .. } => Self::Conflict(err.to_string()),
            LifecycleError::Entity(e) => e.into(),
            LifecycleError::ResourceLimitReached(m) | LifecycleError::InvalidTransition(m) => {
                Self::BadRequest(m)
            }
            LifecycleError::Scheduler(e) => Self::Upstream(e.to_string()),
            LifecycleError::LowDisk(m) => Self::LowDisk(m),
            LifecycleError::Artifact(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

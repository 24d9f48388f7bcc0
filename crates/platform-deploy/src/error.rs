//! HTTP error type for the deployment runtime, mirroring the teacher's
//! `zvault-server::error::AppError` pattern: one sum type, one
//! `IntoResponse` impl, `From` conversions from each domain error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use platform_auth::AuthError;
use platform_core::LifecycleError;
use serde::Serialize;

/// Application-level error returned from deployment-runtime handlers.
#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    LowDisk(String),
    Upstream(String),
    Internal(String),
}

#[derive(Serialize)]
struct Envelope {
    status: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            Self::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
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

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized(m) => Self::Unauthorized(m),
            AuthError::Forbidden(m) => Self::Forbidden(m),
            AuthError::SourceUnreachable(e) => Self::Upstream(e.to_string()),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Validation { .. } | LifecycleError::DuplicateTrain { .. } => {
                Self::BadRequest(err.to_string())
            }
            LifecycleError::Entity(e) => match e {
                platform_entities::EntityError::NotFound { .. } => Self::NotFound(e.to_string()),
                platform_entities::EntityError::Conflict { .. }
                | platform_entities::EntityError::Validation { .. } => {
                    Self::BadRequest(e.to_string())
                }
                platform_entities::EntityError::Database(_) => Self::Internal(e.to_string()),
            },
            LifecycleError::ResourceLimitReached(m) | LifecycleError::InvalidTransition(m) => {
                Self::BadRequest(m)
            }
            LifecycleError::Scheduler(e) => Self::Upstream(e.to_string()),
            LifecycleError::LowDisk(m) => Self::LowDisk(m),
            LifecycleError::Artifact(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

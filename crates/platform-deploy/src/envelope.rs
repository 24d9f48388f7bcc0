//! The `{status, message, data?}` response envelope every HTTP endpoint in
//! this system returns (spec.md §6).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                status: "success",
                message: message.into(),
                data: Some(data),
            }),
        )
    }

    pub fn accepted(message: impl Into<String>) -> (StatusCode, Json<Envelope<()>>) {
        (
            StatusCode::ACCEPTED,
            Json(Envelope {
                status: "success",
                message: message.into(),
                data: None,
            }),
        )
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

//! Error responses.
//!
//! Failures leave the service as `{"status":"error","message":...}` with a
//! status chosen by error kind. Upstream timeouts become 504 Gateway Timeout.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::upstream::UpstreamError;

/// JSON envelope shared by errors and `/health`.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
    pub message: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(StatusBody {
            status: "error",
            message: message.into(),
        }),
    )
        .into_response()
}

pub fn status_code_for(err: &UpstreamError) -> StatusCode {
    match err {
        UpstreamError::NotFound(_) => StatusCode::NOT_FOUND,
        UpstreamError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        UpstreamError::ExternalApi { .. } => StatusCode::BAD_GATEWAY,
        UpstreamError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        error_response(status_code_for(&self), self.to_string())
    }
}

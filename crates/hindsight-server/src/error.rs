//! Error types for the server and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use hindsight_pipeline::PipelineError;
use hindsight_types::{FieldViolation, ValidationError};

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed caller input, with per-field detail.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An upstream language-model call timed out.
    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// An upstream language-model call failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(v) => ServerError::Validation(v),
            e @ PipelineError::Upstream { .. } => {
                if e.is_upstream_timeout() {
                    ServerError::UpstreamTimeout(e.to_string())
                } else {
                    ServerError::Upstream(e.to_string())
                }
            }
            PipelineError::Store(e) => ServerError::Internal(e.to_string()),
            PipelineError::Index(e) => ServerError::Internal(e.to_string()),
        }
    }
}

impl From<hindsight_store::StoreError> for ServerError {
    fn from(err: hindsight_store::StoreError) -> Self {
        ServerError::Internal(err.to_string())
    }
}

/// Result type for handler functions.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Structured error body.
///
/// Validation errors carry per-field violations; everything else is a single
/// message with no internal state exposed.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Per-field detail, present only for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<FieldViolation>>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServerError::UpstreamTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "upstream_timeout"),
            ServerError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = self.to_string();
        let violations = match &self {
            ServerError::Validation(v) => Some(v.violations.clone()),
            _ => None,
        };

        match &self {
            ServerError::Internal(_) => {
                tracing::error!(status = %status, code, error = %message, "Server error");
            }
            _ => {
                tracing::warn!(status = %status, code, error = %message, "Request failed");
            }
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
            violations,
        };

        (status, Json(body)).into_response()
    }
}

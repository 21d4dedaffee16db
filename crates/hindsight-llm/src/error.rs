//! Error types for language-model calls.

use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for language-model operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider returned a non-success status or unusable response.
    #[error("backend error: {0}")]
    Backend(String),

    /// Network/connectivity failure (retryable).
    #[error("network error: {0}")]
    Network(String),

    /// The upstream call exceeded its deadline (retryable).
    #[error("upstream timeout: {0}")]
    Timeout(String),

    /// The model responded, but not with the structured shape we demanded.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Configuration error (API key missing, bad base URL, etc.).
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid request parameters (e.g. empty input text).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization/deserialization failure building the request.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether the caller may retry the whole operation.
    ///
    /// Timeouts and transport failures are transient; extraction, config,
    /// and request-shape errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(err.to_string())
        } else if err.is_connect() {
            LlmError::Network(format!("connection failed: {err}"))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

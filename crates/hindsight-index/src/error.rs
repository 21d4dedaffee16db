//! Error types for the vector index.

use thiserror::Error;

/// Errors that can occur in the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Database connection or statement failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Metadata failed to serialize or parse.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A vector's length does not match the index's configured dimensions.
    ///
    /// This indicates embedding-model drift between writes and the configured
    /// embedder. Fatal; never truncate or pad to work around it.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensions the index was created with.
        expected: usize,
        /// Dimensions of the offending vector or configuration.
        actual: usize,
    },

    /// The index was opened with a different embedding provider than the one
    /// that wrote it.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

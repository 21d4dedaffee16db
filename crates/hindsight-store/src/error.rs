//! Error types for the relational store.

use thiserror::Error;

/// Errors that can occur in the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or statement failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON column failed to serialize or parse.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored value could not be interpreted (bad timestamp, etc.).
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

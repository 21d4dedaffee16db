//! Error types for pipeline orchestration.

use thiserror::Error;

use hindsight_index::IndexError;
use hindsight_llm::LlmError;
use hindsight_store::StoreError;
use hindsight_types::ValidationError;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The pipeline step an upstream language-model failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Summarization,
    Insights,
    DocumentEmbedding,
    QueryEmbedding,
}

impl Stage {
    /// Short name used in error messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "entity extraction",
            Stage::Summarization => "summarization",
            Stage::Insights => "insight derivation",
            Stage::DocumentEmbedding => "document embedding",
            Stage::QueryEmbedding => "query embedding",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type for ingestion and search orchestration.
///
/// Upstream failures propagate unmodified apart from stage context; the
/// orchestrator has no compensating logic, so callers retry whole requests
/// (which the idempotent write paths make safe).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed caller input. Detected before any external call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A language-model call failed or timed out.
    #[error("{stage} failed: {source}")]
    Upstream {
        /// Which pipeline step was running.
        stage: Stage,
        /// The underlying failure.
        source: LlmError,
    },

    /// Relational store failure.
    #[error("relational store error: {0}")]
    Store(#[from] StoreError),

    /// Vector index failure (including dimension mismatches).
    #[error("vector index error: {0}")]
    Index(#[from] IndexError),
}

impl PipelineError {
    /// Attach stage context to an upstream failure.
    pub fn upstream(stage: Stage, source: LlmError) -> Self {
        Self::Upstream { stage, source }
    }

    /// Whether the caller may retry the whole request.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Whether this is specifically an upstream timeout (vs. any other
    /// upstream failure). Drives the 504-vs-502 distinction at the HTTP edge.
    pub fn is_upstream_timeout(&self) -> bool {
        matches!(
            self,
            Self::Upstream {
                source: LlmError::Timeout(_),
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_names_stage() {
        let err = PipelineError::upstream(
            Stage::Extraction,
            LlmError::Timeout("deadline exceeded".to_string()),
        );
        let msg = err.to_string();
        assert!(msg.contains("entity extraction"));
        assert!(msg.contains("deadline exceeded"));
    }

    #[test]
    fn test_retryability_follows_upstream() {
        let timeout =
            PipelineError::upstream(Stage::QueryEmbedding, LlmError::Timeout("slow".into()));
        assert!(timeout.is_retryable());

        let extraction = PipelineError::upstream(
            Stage::Extraction,
            LlmError::Extraction("bad shape".into()),
        );
        assert!(!extraction.is_retryable());

        let validation: PipelineError =
            ValidationError::single("title", "must not be empty").into();
        assert!(!validation.is_retryable());
    }
}

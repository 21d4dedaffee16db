//! Language-model adapters for Hindsight.
//!
//! Two concerns live here, both backed by OpenAI-compatible HTTP APIs:
//!
//! - **Analysis** ([`TranscriptAnalyzer`]): entity extraction, summarization,
//!   and insight derivation from raw transcript text.
//! - **Embeddings** ([`Embedder`]): fixed-length semantic vectors for the
//!   vector index.
//!
//! Both traits ship deterministic mock implementations so the pipeline and
//! server can be exercised without network access.

pub mod analyzer;
pub mod embeddings;
pub mod error;

pub use analyzer::{
    AnalyzerConfig, MockAnalyzer, OpenAiAnalyzer, SharedAnalyzer, TranscriptAnalyzer,
};
pub use embeddings::{
    Embedder, MockEmbedder, OpenAiEmbedder, OpenAiEmbedderConfig, SharedEmbedder,
};
pub use error::{LlmError, Result};

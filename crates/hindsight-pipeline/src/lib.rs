//! Ingestion and search orchestration for Hindsight.
//!
//! This is the only crate that spans both stores. Ingestion turns one
//! validated submission into a relationally persisted, vector-indexed
//! transcript; search turns a free-text query into fused, ranked results.
//! Everything upstream (HTTP routes, the CLI) is thin glue over these two
//! operations.

pub mod error;
mod ingest;
mod pipeline;
mod search;

pub use error::{PipelineError, Result, Stage};
pub use ingest::{ExtractionReport, IngestReport};
pub use pipeline::Pipeline;
pub use search::{DEFAULT_SEARCH_LIMIT, SearchResult, similarity_from_distance};

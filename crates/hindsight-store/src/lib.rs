//! Relational persistence for Hindsight.
//!
//! One SQLite database holds transcripts, their normalized entities, and the
//! link tables between them. The crate exposes the transactional ingestion
//! write, batched hydration for search fusion, the detail/list read paths,
//! and the analytics aggregates. Vector storage lives elsewhere
//! (`hindsight-index`); the only coupling is the shared `transcript_id`
//! business key and the `embedding_indexed` marker column.

pub mod error;
mod store;

pub use error::{Result, StoreError};
pub use store::{
    IngestedTranscript, ParticipantStat, PendingEmbedding, RelationalStore,
    SentimentTrendPoint, TopicStat, TranscriptFilter,
};

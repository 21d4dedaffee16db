//! HTTP route handlers.

mod analytics;
mod health;
mod ingest;
mod search;
mod transcripts;

pub use analytics::{participants_handler, sentiment_trend_handler, topics_handler};
pub use health::health_routes;
pub use ingest::ingest_handler;
pub use search::{SearchQuery, SearchResponse, search_handler};
pub use transcripts::{
    ListQuery, delete_transcript_handler, get_transcript_handler, list_transcripts_handler,
};

//! Application state shared across handlers.

use std::sync::Arc;

use hindsight_pipeline::Pipeline;
use hindsight_store::RelationalStore;

/// Application state shared across all handlers.
///
/// The pipeline carries every external dependency (analyzer, embedder, both
/// stores), built once at startup and injected here.
#[derive(Clone)]
pub struct AppState {
    /// The ingestion/search pipeline.
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Create application state around a wired pipeline.
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// The relational store handle, for the read-only presentation routes.
    pub fn store(&self) -> &Arc<RelationalStore> {
        self.pipeline.store()
    }
}

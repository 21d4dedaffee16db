//! Search orchestration: query embedding, nearest-neighbor retrieval,
//! relational hydration, and result fusion.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hindsight_types::{TranscriptRecord, ValidationError};

use crate::error::{PipelineError, Result, Stage};
use crate::pipeline::Pipeline;

/// Default number of results when the caller does not specify a limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// One fused search result: a hydrated transcript plus its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub transcript: TranscriptRecord,
    /// In (0, 1]; 1 means an exact vector match.
    pub similarity_score: f32,
}

/// Convert a non-negative vector distance into a similarity score.
///
/// Monotonically decreasing in distance and bounded in (0, 1], with
/// `similarity(0) == 1`.
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

impl Pipeline {
    /// Search transcripts semantically related to `query`.
    ///
    /// Returns at most `limit` results, best match first. An empty index
    /// yields an empty list; neighbors with no relational counterpart are
    /// logged as a consistency gap and dropped.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(ValidationError::single("q", "must not be empty").into());
        }

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| PipelineError::upstream(Stage::QueryEmbedding, e))?;

        let neighbors = self.index.search(&query_embedding, limit)?;
        if neighbors.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = neighbors.iter().map(|n| n.transcript_id.clone()).collect();
        let records = self.store.hydrate_by_business_ids(&ids)?;
        let mut by_id: HashMap<String, TranscriptRecord> = records
            .into_iter()
            .map(|r| (r.transcript_id.clone(), r))
            .collect();

        let mut results = Vec::with_capacity(neighbors.len());
        for neighbor in &neighbors {
            match by_id.remove(&neighbor.transcript_id) {
                Some(transcript) => results.push(SearchResult {
                    transcript,
                    similarity_score: similarity_from_distance(neighbor.distance),
                }),
                None => warn!(
                    transcript_id = %neighbor.transcript_id,
                    "Consistency gap: vector record has no relational row; dropped from results"
                ),
            }
        }

        // Stable sort: ties keep the index's own return order
        results.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(query_len = query.len(), returned = results.len(), "Search complete");
        Ok(results)
    }
}

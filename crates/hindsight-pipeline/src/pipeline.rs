//! The pipeline handle: every external dependency in one injectable place.

use std::sync::Arc;

use hindsight_index::{IndexError, VectorIndex};
use hindsight_llm::{SharedAnalyzer, SharedEmbedder};
use hindsight_store::RelationalStore;

use crate::error::Result;

/// The ingestion-and-retrieval pipeline.
///
/// Holds shared handles to the analyzer, embedder, and both stores. All
/// handles are injected so tests can substitute deterministic fakes; nothing
/// here reaches for ambient globals.
pub struct Pipeline {
    pub(crate) analyzer: SharedAnalyzer,
    pub(crate) embedder: SharedEmbedder,
    pub(crate) store: Arc<RelationalStore>,
    pub(crate) index: Arc<VectorIndex>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("store", &self.store)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Wire up a pipeline.
    ///
    /// Fails fast if the embedder's dimensionality does not match the vector
    /// index, a config error that would otherwise surface on the first write.
    pub fn new(
        analyzer: SharedAnalyzer,
        embedder: SharedEmbedder,
        store: Arc<RelationalStore>,
        index: Arc<VectorIndex>,
    ) -> Result<Self> {
        if embedder.dimensions() != index.dimensions() {
            return Err(IndexError::DimensionMismatch {
                expected: index.dimensions(),
                actual: embedder.dimensions(),
            }
            .into());
        }

        Ok(Self {
            analyzer,
            embedder,
            store,
            index,
        })
    }

    /// The relational store handle.
    pub fn store(&self) -> &Arc<RelationalStore> {
        &self.store
    }

    /// The vector index handle.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Delete a transcript from both stores. Returns whether the relational
    /// row existed.
    pub fn remove(&self, transcript_id: &str) -> Result<bool> {
        let existed = self.store.delete_by_business_id(transcript_id)?;
        self.index.remove(transcript_id)?;
        Ok(existed)
    }
}

//! Ingestion orchestration: one validated submission in, one fully
//! persisted and searchable transcript out.
//!
//! Ordering matters: validation runs before any external call so malformed
//! input never pays for a language-model invocation; the three derivations
//! run concurrently; the relational writes commit as a single transaction;
//! and the vector upsert is a separately retryable finalize step with a
//! durable marker, so a crash in between can be resumed instead of leaving a
//! silent cross-store gap.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hindsight_index::EmbeddingRecord;
use hindsight_types::{Sentiment, TranscriptSubmission};

use crate::error::{PipelineError, Result, Stage};
use crate::pipeline::Pipeline;

/// What ingestion derived and persisted, returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// The caller-supplied business id.
    pub id: String,
    /// Always `"processed"` on success.
    pub status: String,
    /// Everything the language model derived.
    pub extracted: ExtractionReport,
}

/// Derived fields bundled into the ingestion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub topics: Vec<String>,
    pub action_items: Vec<String>,
    pub decisions: Vec<String>,
    pub sentiment: Sentiment,
    pub summary: String,
    pub key_insights: Vec<String>,
}

impl Pipeline {
    /// Ingest one transcript submission.
    ///
    /// Safe to repeat: every relational write is idempotent and the vector
    /// upsert replaces by key, so retrying after an upstream failure cannot
    /// duplicate rows.
    pub async fn ingest(&self, submission: TranscriptSubmission) -> Result<IngestReport> {
        submission.validate()?;

        let text = submission.transcript.as_str();
        let (entities, summary, insights) = tokio::try_join!(
            async {
                self.analyzer
                    .extract(text)
                    .await
                    .map_err(|e| PipelineError::upstream(Stage::Extraction, e))
            },
            async {
                self.analyzer
                    .summarize(text)
                    .await
                    .map_err(|e| PipelineError::upstream(Stage::Summarization, e))
            },
            async {
                self.analyzer
                    .derive_insights(text)
                    .await
                    .map_err(|e| PipelineError::upstream(Stage::Insights, e))
            },
        )?;

        let ingested = self
            .store
            .apply_ingestion(&submission, &entities, &summary, &insights)?;

        if !ingested.created {
            info!(
                transcript_id = %submission.transcript_id,
                "Re-ingestion of existing transcript; relational row reused"
            );
        }

        self.finalize_embedding(
            &submission.transcript_id,
            &submission.transcript,
            &submission.title,
            &submission.occurred_at,
            ingested.db_id,
        )
        .await?;

        info!(
            transcript_id = %submission.transcript_id,
            topics = entities.topics.len(),
            action_items = entities.action_items.len(),
            decisions = entities.decisions.len(),
            "Transcript ingested"
        );

        Ok(IngestReport {
            id: submission.transcript_id,
            status: "processed".to_string(),
            extracted: ExtractionReport {
                topics: entities.topics,
                action_items: entities.action_items,
                decisions: entities.decisions,
                sentiment: entities.sentiment,
                summary,
                key_insights: insights,
            },
        })
    }

    /// The finalize step: embed the raw text, upsert the vector record, and
    /// set the durable `embedding_indexed` marker.
    ///
    /// Idempotent against an already-persisted transcript; may be re-run on
    /// its own until it succeeds.
    pub async fn finalize_embedding(
        &self,
        transcript_id: &str,
        text: &str,
        title: &str,
        occurred_at: &str,
        db_id: i64,
    ) -> Result<()> {
        let embedding = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| PipelineError::upstream(Stage::DocumentEmbedding, e))?;

        self.index.upsert(&EmbeddingRecord {
            transcript_id: transcript_id.to_string(),
            embedding,
            document: text.to_string(),
            metadata: serde_json::json!({
                "title": title,
                "occurred_at": occurred_at,
                "db_id": db_id,
            }),
        })?;

        self.store.mark_embedding_indexed(transcript_id)?;
        Ok(())
    }

    /// Re-run the finalize step for every transcript whose marker is unset.
    ///
    /// Returns how many were repaired. Used at startup or on demand to close
    /// the gap a crash mid-ingestion leaves behind.
    pub async fn resume_pending(&self) -> Result<usize> {
        let pending = self.store.list_unindexed()?;
        if pending.is_empty() {
            return Ok(0);
        }

        warn!(count = pending.len(), "Resuming unfinalized transcripts");
        let total = pending.len();
        for p in &pending {
            self.finalize_embedding(
                &p.transcript_id,
                &p.transcript_text,
                &p.title,
                &p.occurred_at,
                p.db_id,
            )
            .await?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hindsight_index::VectorIndex;
    use hindsight_llm::{MockAnalyzer, MockEmbedder};
    use hindsight_store::RelationalStore;
    use hindsight_types::ParticipantSpec;

    fn pipeline_with(analyzer: MockAnalyzer) -> Pipeline {
        let store = Arc::new(RelationalStore::open_in_memory().unwrap());
        let index = Arc::new(VectorIndex::open_in_memory(8, "mock").unwrap());
        Pipeline::new(
            Arc::new(analyzer),
            Arc::new(MockEmbedder::new(8)),
            store,
            index,
        )
        .unwrap()
    }

    fn submission(id: &str) -> TranscriptSubmission {
        TranscriptSubmission {
            transcript_id: id.to_string(),
            title: "Planning".to_string(),
            occurred_at: "2025-04-01T09:00:00Z".to_string(),
            duration_minutes: 30.0,
            participants: vec![ParticipantSpec {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                role: None,
            }],
            transcript: "Ada: the plan is good.".to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_ingest_returns_report_and_persists_both_stores() {
        let pipeline = pipeline_with(MockAnalyzer::default());
        let report = pipeline.ingest(submission("m-1")).await.unwrap();

        assert_eq!(report.id, "m-1");
        assert_eq!(report.status, "processed");
        assert_eq!(report.extracted.topics, vec!["planning", "budget"]);
        assert_eq!(report.extracted.sentiment, Sentiment::Positive);
        assert!(!report.extracted.summary.is_empty());

        assert_eq!(pipeline.store().transcript_count().unwrap(), 1);
        assert!(pipeline.index().contains("m-1").unwrap());
        // The durable marker is set once the finalize step completes
        assert!(pipeline.store().list_unindexed().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_submission_rejected_before_any_side_effect() {
        let pipeline = pipeline_with(MockAnalyzer::default());
        let mut bad = submission("m-1");
        bad.transcript = String::new();
        bad.duration_minutes = -1.0;

        let err = pipeline.ingest(bad).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(pipeline.store().transcript_count().unwrap(), 0);
        assert_eq!(pipeline.index().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_aborts_with_no_partial_persist() {
        let pipeline = pipeline_with(MockAnalyzer::failing("model is down"));
        let err = pipeline.ingest(submission("m-1")).await.unwrap_err();

        assert!(matches!(err, PipelineError::Upstream { .. }));
        assert_eq!(pipeline.store().transcript_count().unwrap(), 0);
        assert_eq!(pipeline.index().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reingest_same_id_is_idempotent() {
        let pipeline = pipeline_with(MockAnalyzer::default());
        pipeline.ingest(submission("m-1")).await.unwrap();
        pipeline.ingest(submission("m-1")).await.unwrap();

        assert_eq!(pipeline.store().transcript_count().unwrap(), 1);
        assert_eq!(pipeline.index().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resume_pending_finalizes_unmarked_rows() {
        let pipeline = pipeline_with(MockAnalyzer::default());

        // Simulate a crash after the relational commit but before the
        // finalize step: the row exists, the marker and vector do not.
        let entities = hindsight_types::ExtractedEntities::default();
        pipeline
            .store()
            .apply_ingestion(&submission("m-1"), &entities, "Summary.", &[])
            .unwrap();
        assert!(!pipeline.index().contains("m-1").unwrap());
        assert_eq!(pipeline.store().list_unindexed().unwrap().len(), 1);

        assert_eq!(pipeline.resume_pending().await.unwrap(), 1);

        assert!(pipeline.index().contains("m-1").unwrap());
        assert!(pipeline.store().list_unindexed().unwrap().is_empty());

        // Nothing left to repair on a second pass
        assert_eq!(pipeline.resume_pending().await.unwrap(), 0);
    }
}

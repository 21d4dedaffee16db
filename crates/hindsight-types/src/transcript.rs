//! Persisted transcript records as hydrated from the relational store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Sentiment;

/// A participant attached to a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// A fully hydrated transcript: the row itself plus aggregated participants
/// and topics. This is the shape search results are built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// Relational surrogate id; the join key for linked entities.
    pub id: i64,
    /// Caller-supplied business identifier; the cross-store join key.
    pub transcript_id: String,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
    pub duration_minutes: f64,
    pub transcript_text: String,
    /// Free-form caller metadata as submitted.
    pub metadata: serde_json::Value,
    pub sentiment: Sentiment,
    pub summary: String,
    pub key_insights: Vec<String>,
    /// Whether the vector-index finalize step has completed for this row.
    pub embedding_indexed: bool,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<ParticipantRef>,
    pub topics: Vec<String>,
}

/// A transcript with its owned child rows, as served by the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptDetail {
    #[serde(flatten)]
    pub record: TranscriptRecord,
    pub action_items: Vec<String>,
    pub decisions: Vec<String>,
}

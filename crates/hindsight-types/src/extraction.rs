//! Structured facts derived from transcript text by the language model.

use serde::{Deserialize, Serialize};

use crate::Sentiment;

/// Entities extracted from one transcript.
///
/// Produced by the analyzer's `extract` operation. Missing fields in the
/// model's output default to empty lists / neutral sentiment rather than
/// failing the call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    /// Main themes discussed (typically 3–7).
    #[serde(default)]
    pub topics: Vec<String>,
    /// Specific tasks assigned during the meeting.
    #[serde(default)]
    pub action_items: Vec<String>,
    /// Decisions reached.
    #[serde(default)]
    pub decisions: Vec<String>,
    /// Overall tone of the meeting.
    #[serde(default)]
    pub sentiment: Sentiment,
}

//! Transcript read and delete endpoints. Thin glue over the store and
//! pipeline; no logic of their own.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use hindsight_store::TranscriptFilter;
use hindsight_types::{TranscriptDetail, TranscriptRecord};

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Query params for the transcript list.
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    /// Participant email (exact) or name substring.
    pub participant: Option<String>,
    /// Inclusive lower bound on occurrence time (RFC 3339).
    pub start_date: Option<String>,
    /// Inclusive upper bound on occurrence time (RFC 3339).
    pub end_date: Option<String>,
}

/// `GET /api/transcripts`: list transcripts newest-first, with optional
/// participant/date filters.
pub async fn list_transcripts_handler(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<TranscriptRecord>>> {
    let filter = TranscriptFilter {
        participant: params.participant,
        start_date: params.start_date,
        end_date: params.end_date,
    };
    let records = state.store().list_transcripts(&filter)?;
    Ok(Json(records))
}

/// `GET /api/transcripts/{id}`: one transcript with participants, topics,
/// action items, and decisions.
pub async fn get_transcript_handler(
    State(state): State<AppState>,
    Path(transcript_id): Path<String>,
) -> Result<Json<TranscriptDetail>> {
    let detail = state
        .store()
        .get_detail(&transcript_id)?
        .ok_or_else(|| ServerError::NotFound(format!("transcript '{transcript_id}'")))?;
    Ok(Json(detail))
}

/// `DELETE /api/transcripts/{id}`: remove a transcript from both stores.
pub async fn delete_transcript_handler(
    State(state): State<AppState>,
    Path(transcript_id): Path<String>,
) -> Result<StatusCode> {
    let existed = state.pipeline.remove(&transcript_id)?;
    if !existed {
        return Err(ServerError::NotFound(format!("transcript '{transcript_id}'")));
    }
    Ok(StatusCode::NO_CONTENT)
}

//! Transcript ingestion endpoint.

use axum::{Json, extract::State, http::StatusCode};

use hindsight_pipeline::IngestReport;
use hindsight_types::TranscriptSubmission;

use crate::error::Result;
use crate::state::AppState;

/// `POST /api/ingest`: run one submission through the full pipeline.
///
/// Returns 201 with the extraction report; 400 with per-field violations for
/// malformed input; 502/504 for upstream model failures.
pub async fn ingest_handler(
    State(state): State<AppState>,
    Json(submission): Json<TranscriptSubmission>,
) -> Result<(StatusCode, Json<IngestReport>)> {
    let report = state.pipeline.ingest(submission).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

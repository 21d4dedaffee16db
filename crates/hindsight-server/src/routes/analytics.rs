//! Aggregate endpoints over the relational store.

use axum::{Json, extract::State};

use hindsight_store::{ParticipantStat, SentimentTrendPoint, TopicStat};

use crate::error::Result;
use crate::state::AppState;

/// `GET /api/analytics/topics`: topic frequency, most-discussed first.
pub async fn topics_handler(State(state): State<AppState>) -> Result<Json<Vec<TopicStat>>> {
    Ok(Json(state.store().topic_frequency()?))
}

/// `GET /api/analytics/participants`: per-participant meeting counts.
pub async fn participants_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ParticipantStat>>> {
    Ok(Json(state.store().participant_activity()?))
}

/// `GET /api/analytics/sentiment-trend`: per-day average sentiment.
pub async fn sentiment_trend_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<SentimentTrendPoint>>> {
    Ok(Json(state.store().sentiment_trend()?))
}

//! Semantic search endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use hindsight_pipeline::{DEFAULT_SEARCH_LIMIT, SearchResult};

use crate::error::Result;
use crate::state::AppState;

/// Query params for `GET /api/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Free-text query. Required; an empty or missing value is a validation
    /// error surfaced by the pipeline.
    #[serde(default)]
    pub q: String,
    /// Maximum result count (defaults to 5).
    pub limit: Option<usize>,
}

/// Response body for the search endpoint.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

/// `GET /api/search?q=...&limit=5`: embed the query, retrieve neighbors,
/// hydrate, fuse, and rank.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let results = state.pipeline.search(&params.q, limit).await?;
    Ok(Json(SearchResponse { results }))
}

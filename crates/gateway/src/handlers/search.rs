//! Search handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use super::validate_request;
use crate::AppState;
use bouwrag_common::errors::Result;
use bouwrag_search::{RetrievalMode, RetrievalOptions, RetrievedChunk};

/// Search request
#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,

    /// Maximum results to return
    #[validate(range(min = 1, max = 50))]
    pub top_k: Option<usize>,

    /// Minimum score threshold
    #[validate(range(min = 0.0, max = 1.0))]
    pub similarity_threshold: Option<f32>,

    /// false selects pure vector search
    pub use_hybrid_search: Option<bool>,

    /// vector, keyword or hybrid; overrides `use_hybrid_search`
    pub mode: Option<RetrievalMode>,
}

/// Search response
#[derive(Serialize)]
pub struct SearchResponse {
    pub project_id: Uuid,
    pub query: String,
    pub total_results: usize,
    pub results: Vec<RetrievedChunk>,
    pub processing_time_ms: u64,
}

/// Rank a project's chunks against a query
pub async fn search(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();
    validate_request(&request)?;

    let options = RetrievalOptions {
        project_id,
        query: request.query.clone(),
        top_k: request.top_k,
        similarity_threshold: request.similarity_threshold,
        use_hybrid_search: request.use_hybrid_search,
        mode: request.mode,
    };
    let results = state.retriever.find_relevant_content(&options).await?;

    Ok(Json(SearchResponse {
        project_id,
        query: request.query,
        total_results: results.len(),
        results,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SimilarQuery {
    #[serde(default = "default_similar_top_k")]
    #[validate(range(min = 1, max = 50))]
    pub top_k: usize,
}

fn default_similar_top_k() -> usize { 3 }

#[derive(Serialize)]
pub struct SimilarResponse {
    pub project_id: Uuid,
    pub chunk_id: Uuid,
    pub results: Vec<RetrievedChunk>,
}

/// Nearest neighbours of a stored chunk
pub async fn similar_chunks(
    State(state): State<AppState>,
    Path((project_id, chunk_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<SimilarQuery>,
) -> Result<Json<SimilarResponse>> {
    validate_request(&query)?;

    let results = state
        .retriever
        .find_similar_chunks(project_id, chunk_id, query.top_k)
        .await?;

    Ok(Json(SimilarResponse {
        project_id,
        chunk_id,
        results,
    }))
}

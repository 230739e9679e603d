//! Multi-hop retrieval handler

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use super::validate_request;
use crate::AppState;
use bouwrag_common::errors::Result;
use bouwrag_search::{HopRecord, MultiHopOptions, RetrievedChunk};

#[derive(Debug, Deserialize, Validate)]
pub struct MultiHopRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,

    #[validate(range(min = 1, max = 10))]
    pub max_hops: Option<usize>,

    /// Results for the original query
    #[validate(range(min = 1, max = 50))]
    pub top_k: Option<usize>,

    #[validate(range(min = 0.0, max = 1.0))]
    pub similarity_threshold: Option<f32>,

    /// Results per followed reference
    #[validate(range(min = 1, max = 20))]
    pub hop_top_k: Option<usize>,
}

#[derive(Serialize)]
pub struct MultiHopResponse {
    pub project_id: Uuid,
    pub query: String,
    pub total_results: usize,
    pub results: Vec<RetrievedChunk>,
    pub hops: Vec<HopRecord>,
    pub processing_time_ms: u64,
}

/// Retrieve and follow article and table references
pub async fn multi_hop(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<MultiHopRequest>,
) -> Result<Json<MultiHopResponse>> {
    let start = Instant::now();
    validate_request(&request)?;

    let options = MultiHopOptions {
        project_id,
        query: request.query.clone(),
        max_hops: request.max_hops,
        top_k: request.top_k,
        similarity_threshold: request.similarity_threshold,
        hop_top_k: request.hop_top_k,
    };
    let outcome = state.multi_hop.retrieve_with_trace(&options).await?;

    Ok(Json(MultiHopResponse {
        project_id,
        query: request.query,
        total_results: outcome.chunks.len(),
        results: outcome.chunks,
        hops: outcome.hops,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{chunk, state_with};
    use bouwrag_common::errors::AppError;

    fn request(query: &str) -> MultiHopRequest {
        MultiHopRequest {
            query: query.to_string(),
            max_hops: Some(2),
            top_k: None,
            similarity_threshold: None,
            hop_top_k: None,
        }
    }

    #[tokio::test]
    async fn test_returns_hop_trace() {
        let project = Uuid::new_v4();
        let state = state_with(vec![chunk(project, 0, "Artikel 4.163 vrije hoogte")]).await;

        let Json(response) = multi_hop(State(state), Path(project), Json(request("vrije hoogte")))
            .await
            .unwrap();

        assert_eq!(response.hops[0].hop_number, 0);
        assert_eq!(response.hops[0].queries, vec!["vrije hoogte".to_string()]);
        assert_eq!(response.total_results, response.results.len());
        assert!(response.results.iter().all(|c| c.project_id == project));
    }

    #[tokio::test]
    async fn test_max_hops_bounded() {
        let state = state_with(vec![]).await;
        let mut req = request("hoogte");
        req.max_hops = Some(25);
        let result = multi_hop(State(state), Path(Uuid::new_v4()), Json(req)).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}

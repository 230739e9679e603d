//! Legal RAG agent handler

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
use bouwrag_context::{AgentQueryOptions, AgentResult};

#[derive(Debug, Deserialize, Validate)]
pub struct AgentQueryRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,

    /// Model-turn budget
    #[validate(range(min = 1, max = 20))]
    pub max_steps: Option<usize>,
}

#[derive(Serialize)]
pub struct AgentQueryResponse {
    pub project_id: Uuid,
    #[serde(flatten)]
    pub result: AgentResult,
    pub processing_time_ms: u64,
}

/// Answer a question with the tool-calling agent
pub async fn query(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<AgentQueryRequest>,
) -> Result<Json<AgentQueryResponse>> {
    let start = Instant::now();
    validate_request(&request)?;

    let options = AgentQueryOptions {
        project_id,
        query: request.query,
        max_steps: request.max_steps,
    };
    let result = state.agent.query(&options).await?;

    Ok(Json(AgentQueryResponse {
        project_id,
        result,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::state_with;
    use bouwrag_common::errors::AppError;
    use bouwrag_context::Confidence;

    #[tokio::test]
    async fn test_text_reply_is_low_confidence() {
        let state = state_with(vec![]).await;
        let request = AgentQueryRequest {
            query: "Wat is de minimale vrije hoogte?".to_string(),
            max_steps: Some(3),
        };

        let Json(response) = query(State(state), Path(Uuid::new_v4()), Json(request))
            .await
            .unwrap();

        assert_eq!(response.result.confidence, Confidence::Low);
        assert!(response.result.answer.contains("minimale vrije hoogte"));
        assert!(response.result.sources.is_empty());
        assert_eq!(response.result.steps.len(), 1);
        assert_eq!(response.result.turns, 1);
    }

    #[tokio::test]
    async fn test_zero_steps_rejected() {
        let state = state_with(vec![]).await;
        let request = AgentQueryRequest {
            query: "hoogte".to_string(),
            max_steps: Some(0),
        };
        let result = query(State(state), Path(Uuid::new_v4()), Json(request)).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}

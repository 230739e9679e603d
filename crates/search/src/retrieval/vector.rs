//! Vector similarity search
//!
//! Provides semantic search via embedding similarity

use super::{ChunkStore, RetrievalMode, RetrievedChunk, Retriever, SearchRequest};
use bouwrag_common::errors::{AppError, Result};
use std::sync::Arc;

/// Vector retriever over a [`ChunkStore`]
pub struct VectorRetriever {
    store: Arc<dyn ChunkStore>,
}

impl VectorRetriever {
    /// Create a new vector retriever
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, request: &SearchRequest) -> Result<Vec<RetrievedChunk>> {
        let embedding = request
            .query_embedding
            .as_ref()
            .ok_or_else(|| AppError::Validation {
                message: "Vector search requires query embedding".to_string(),
                field: Some("query_embedding".to_string()),
            })?;

        let min_score = request.min_score.unwrap_or(0.0);

        self.store
            .vector_search(request.project_id, embedding, request.limit, min_score)
            .await
    }

    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::test_support::{axis, record, store_with};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_requires_embedding() {
        let store = Arc::new(store_with(vec![]).await);
        let retriever = VectorRetriever::new(store);
        let result = retriever.retrieve(&SearchRequest::default()).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_threshold_applied() {
        let project = Uuid::new_v4();
        let store = Arc::new(
            store_with(vec![
                record(project, 0, "match", axis(3, 0)),
                record(project, 1, "miss", axis(3, 1)),
            ])
            .await,
        );
        let retriever = VectorRetriever::new(store);
        let request = SearchRequest {
            project_id: project,
            query_embedding: Some(axis(3, 0)),
            mode: RetrievalMode::Vector,
            min_score: Some(0.7),
            ..SearchRequest::default()
        };
        let results = retriever.retrieve(&request).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "match");
    }
}

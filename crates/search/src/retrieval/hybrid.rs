//! Hybrid retrieval combining vector and keyword search
//!
//! Uses RRF fusion to combine results from both retrievers. After fusion
//! the top results are filtered against the similarity threshold using the
//! vector similarity, or the fused score when the chunk was only found by
//! keyword. Hybrid search can therefore return fewer than `limit` chunks.

use super::{
    fusion::RRFusion, keyword::KeywordRetriever, vector::VectorRetriever, ChunkStore,
    RetrievalMode, RetrievedChunk, Retriever, SearchRequest,
};
use bouwrag_common::errors::Result;
use std::sync::Arc;

/// Hybrid retriever combining vector and keyword
pub struct HybridRetriever {
    vector: VectorRetriever,
    keyword: KeywordRetriever,
    fusion: RRFusion,
}

impl HybridRetriever {
    /// Create a new hybrid retriever
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self::with_fusion(store, RRFusion::default())
    }

    /// Create with custom fusion parameters
    pub fn with_fusion(store: Arc<dyn ChunkStore>, fusion: RRFusion) -> Self {
        Self {
            vector: VectorRetriever::new(store.clone()),
            keyword: KeywordRetriever::new(store),
            fusion,
        }
    }
}

#[async_trait::async_trait]
impl Retriever for HybridRetriever {
    async fn retrieve(&self, request: &SearchRequest) -> Result<Vec<RetrievedChunk>> {
        // Fetch more results from each retriever for better fusion
        let expanded_limit = request.limit * 2;

        let mut vector_request = request.clone();
        vector_request.limit = expanded_limit;
        vector_request.min_score = None; // We'll filter after fusion

        let mut keyword_request = request.clone();
        keyword_request.limit = expanded_limit;
        keyword_request.min_score = None;

        // Sequential; each request drives one query at a time
        let vector_results = self.vector.retrieve(&vector_request).await?;
        let keyword_results = self.keyword.retrieve(&keyword_request).await?;

        tracing::debug!(
            vector = vector_results.len(),
            keyword = keyword_results.len(),
            "Fusing hybrid candidates"
        );

        let fused = self.fusion.fuse(vector_results, keyword_results, request.limit);

        let min_score = request.min_score.unwrap_or(0.0);
        let chunks: Vec<RetrievedChunk> = fused
            .into_iter()
            .filter(|r| r.vector_similarity.unwrap_or(r.rrf_score) >= min_score)
            .map(|r| r.chunk)
            .collect();

        Ok(chunks)
    }

    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Hybrid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::test_support::{axis, blend, record, store_with};
    use crate::retrieval::MemoryChunkStore;
    use uuid::Uuid;

    fn request(project_id: Uuid, query: &str, embedding: Vec<f32>, min_score: f32) -> SearchRequest {
        SearchRequest {
            project_id,
            query: query.to_string(),
            query_embedding: Some(embedding),
            mode: RetrievalMode::Hybrid,
            limit: 5,
            min_score: Some(min_score),
        }
    }

    async fn corpus(project: Uuid) -> Arc<MemoryChunkStore> {
        Arc::new(
            store_with(vec![
                record(project, 0, "verdiepingshoogte woonfunctie", axis(4, 0)),
                record(project, 1, "vrije hoogte", blend(4, 0, 1, 0.2)),
                record(project, 2, "trap", blend(4, 0, 2, 0.5)),
                record(project, 3, "verdiepingshoogte kantoor", axis(4, 3)),
            ])
            .await,
        )
    }

    #[tokio::test]
    async fn test_keyword_only_chunks_are_filtered() {
        let project = Uuid::new_v4();
        let retriever = HybridRetriever::new(corpus(project).await);

        let results = retriever
            .retrieve(&request(project, "verdiepingshoogte", axis(4, 0), 0.7))
            .await
            .unwrap();

        // chunk 3 matches the keyword but is orthogonal to the query vector
        assert!(results.iter().all(|c| c.text != "verdiepingshoogte kantoor"));
        assert_eq!(results[0].text, "verdiepingshoogte woonfunctie");
        assert!(results.iter().all(|c| c.similarity >= 0.7));
    }

    #[tokio::test]
    async fn test_threshold_monotonicity() {
        let project = Uuid::new_v4();
        let retriever = HybridRetriever::new(corpus(project).await);

        let mut previous = usize::MAX;
        for threshold in [0.0, 0.3, 0.5, 0.7, 0.9, 0.99] {
            let count = retriever
                .retrieve(&request(project, "verdiepingshoogte", axis(4, 0), threshold))
                .await
                .unwrap()
                .len();
            assert!(count <= previous);
            previous = count;
        }
    }

    #[tokio::test]
    async fn test_no_keyword_hits_matches_vector_order() {
        let project = Uuid::new_v4();
        let store = corpus(project).await;
        let hybrid = HybridRetriever::new(store.clone());
        let vector = VectorRetriever::new(store);

        let hybrid_request = request(project, "zzzz", axis(4, 0), 0.3);
        let mut vector_request = hybrid_request.clone();
        vector_request.mode = RetrievalMode::Vector;

        let hybrid_ids: Vec<Uuid> = hybrid
            .retrieve(&hybrid_request)
            .await
            .unwrap()
            .iter()
            .map(|c| c.chunk_id)
            .collect();
        let vector_ids: Vec<Uuid> = vector
            .retrieve(&vector_request)
            .await
            .unwrap()
            .iter()
            .map(|c| c.chunk_id)
            .collect();

        assert!(!hybrid_ids.is_empty());
        assert_eq!(hybrid_ids, vector_ids);
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let store = Arc::new(
            store_with(vec![
                record(a, 0, "verdiepingshoogte", axis(4, 0)),
                record(b, 0, "verdiepingshoogte", axis(4, 0)),
            ])
            .await,
        );
        let retriever = HybridRetriever::new(store);
        let results = retriever
            .retrieve(&request(b, "verdiepingshoogte", axis(4, 0), 0.0))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.iter().all(|c| c.project_id == b));
    }
}

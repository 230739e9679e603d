//! Keyword search using the store's full-text ranking

use super::{ChunkStore, RetrievalMode, RetrievedChunk, Retriever, SearchRequest};
use bouwrag_common::errors::Result;
use std::sync::Arc;

/// Keyword retriever over a [`ChunkStore`]
pub struct KeywordRetriever {
    store: Arc<dyn ChunkStore>,
}

impl KeywordRetriever {
    /// Create a new keyword retriever
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, request: &SearchRequest) -> Result<Vec<RetrievedChunk>> {
        if request.query.trim().is_empty() {
            return Ok(vec![]);
        }

        let mut chunks = self
            .store
            .keyword_search(request.project_id, &request.query, request.limit)
            .await?;

        if let Some(min_score) = request.min_score {
            chunks.retain(|c| c.similarity >= min_score);
        }

        Ok(chunks)
    }

    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Keyword
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::test_support::{axis, record, store_with};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_keyword_ranking() {
        let project = Uuid::new_v4();
        let store = Arc::new(
            store_with(vec![
                record(project, 0, "Tabel 4.162 vrije hoogte, zie tabel", axis(3, 0)),
                record(project, 1, "Artikel 4.163 verwijst naar tabel", axis(3, 1)),
                record(project, 2, "geen treffer", axis(3, 2)),
            ])
            .await,
        );
        let retriever = KeywordRetriever::new(store);
        let request = SearchRequest {
            project_id: project,
            query: "tabel 4.162".into(),
            mode: RetrievalMode::Keyword,
            limit: 10,
            min_score: None,
            ..SearchRequest::default()
        };
        let results = retriever.retrieve(&request).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].text.starts_with("Tabel 4.162"));
        assert!(results.iter().all(|c| c.retrieval_mode == RetrievalMode::Keyword));
    }

    #[tokio::test]
    async fn test_blank_query_returns_nothing() {
        let store = Arc::new(store_with(vec![]).await);
        let retriever = KeywordRetriever::new(store);
        let request = SearchRequest {
            query: "   ".into(),
            ..SearchRequest::default()
        };
        assert!(retriever.retrieve(&request).await.unwrap().is_empty());
    }
}

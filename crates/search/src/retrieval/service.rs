//! Query-level retrieval entry point
//!
//! Embeds the query once, checks the embedding dimension against the
//! configured corpus dimension and dispatches to the retriever for the
//! selected mode.

use super::{
    ChunkStore, HybridRetriever, KeywordRetriever, RRFusion, RetrievalMode, RetrievedChunk,
    Retriever, SearchRequest, VectorRetriever,
};
use bouwrag_common::config::RetrievalConfig;
use bouwrag_common::errors::{AppError, Result};
use bouwrag_common::metrics;
use bouwrag_common::Embedder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Options for [`ContentRetriever::find_relevant_content`].
///
/// Unset fields fall back to the retrieval configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalOptions {
    pub project_id: Uuid,
    pub query: String,
    pub top_k: Option<usize>,
    pub similarity_threshold: Option<f32>,
    pub use_hybrid_search: Option<bool>,
    /// Explicit mode; overrides `use_hybrid_search`
    pub mode: Option<RetrievalMode>,
}

impl RetrievalOptions {
    pub fn new(project_id: Uuid, query: impl Into<String>) -> Self {
        Self {
            project_id,
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn use_hybrid_search(mut self, enabled: bool) -> Self {
        self.use_hybrid_search = Some(enabled);
        self
    }

    pub fn mode(mut self, mode: RetrievalMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Retrieval over one chunk store with one embedder
pub struct ContentRetriever {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
    config: RetrievalConfig,
    expected_dimension: usize,
    vector: VectorRetriever,
    keyword: KeywordRetriever,
    hybrid: HybridRetriever,
}

impl ContentRetriever {
    /// Create a retriever; `expected_dimension` is the dimension of the
    /// stored chunk embeddings
    pub fn new(
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn Embedder>,
        config: RetrievalConfig,
        expected_dimension: usize,
    ) -> Self {
        Self {
            vector: VectorRetriever::new(store.clone()),
            keyword: KeywordRetriever::new(store.clone()),
            hybrid: HybridRetriever::with_fusion(store.clone(), RRFusion::with_k(config.rrf_k)),
            store,
            embedder,
            config,
            expected_dimension,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Rank a project's chunks against a query.
    ///
    /// An empty result is a normal outcome; only infrastructure failures
    /// are errors.
    pub async fn find_relevant_content(
        &self,
        options: &RetrievalOptions,
    ) -> Result<Vec<RetrievedChunk>> {
        let start = Instant::now();

        let mode = options.mode.unwrap_or_else(|| {
            if options.use_hybrid_search.unwrap_or(self.config.use_hybrid_search) {
                RetrievalMode::Hybrid
            } else {
                RetrievalMode::Vector
            }
        });
        let top_k = options.top_k.unwrap_or(self.config.top_k);
        let threshold = options
            .similarity_threshold
            .unwrap_or(self.config.similarity_threshold);

        if options.query.trim().is_empty() || top_k == 0 {
            return Ok(vec![]);
        }

        let query_embedding = if mode.uses_embedding() {
            Some(self.embed_query(&options.query).await?)
        } else {
            None
        };

        let request = SearchRequest {
            project_id: options.project_id,
            query: options.query.clone(),
            query_embedding,
            mode,
            limit: top_k,
            // keyword ranks are not similarities; the threshold does not apply
            min_score: (mode != RetrievalMode::Keyword).then_some(threshold),
        };

        let chunks = self.retriever_for(mode).retrieve(&request).await?;

        let elapsed = start.elapsed();
        metrics::record_search(elapsed.as_secs_f64(), mode.as_str(), chunks.len());
        tracing::info!(
            project_id = %options.project_id,
            mode = mode.as_str(),
            store = self.store.name(),
            top_k,
            threshold,
            results = chunks.len(),
            latency_ms = elapsed.as_millis() as u64,
            "Retrieval completed"
        );

        Ok(chunks)
    }

    /// Nearest neighbours of an existing chunk within its project
    pub async fn find_similar_chunks(
        &self,
        project_id: Uuid,
        chunk_id: Uuid,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let embedding = self
            .store
            .chunk_embedding(project_id, chunk_id)
            .await?
            .ok_or_else(|| AppError::ChunkNotFound {
                id: chunk_id.to_string(),
            })?;
        self.check_dimension(&embedding)?;

        let chunks = self
            .store
            .nearest_to_chunk(project_id, chunk_id, &embedding, top_k)
            .await?;

        tracing::debug!(
            project_id = %project_id,
            chunk_id = %chunk_id,
            results = chunks.len(),
            "Similar chunks retrieved"
        );

        Ok(chunks)
    }

    fn retriever_for(&self, mode: RetrievalMode) -> &dyn Retriever {
        match mode {
            RetrievalMode::Vector => &self.vector,
            RetrievalMode::Keyword => &self.keyword,
            RetrievalMode::Hybrid => &self.hybrid,
        }
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedding = self.embedder.embed(query).await?;
        self.check_dimension(&embedding)?;
        Ok(embedding)
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.expected_dimension {
            return Err(AppError::EmbeddingDimensionMismatch {
                expected: self.expected_dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}

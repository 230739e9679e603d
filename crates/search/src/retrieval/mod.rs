//! Multi-modal retrieval system
//!
//! Provides three retrieval modes:
//! - Vector search (semantic similarity via embeddings)
//! - Keyword search (full-text ranking)
//! - Hybrid search (RRF fusion of vector + keyword)
//!
//! Every search is scoped to one project; chunks never cross project
//! boundaries.

mod fusion;
mod hybrid;
mod keyword;
mod memory;
mod postgres;
mod service;
mod store;
mod vector;

pub use fusion::{FusionResult, RRFusion};
pub use hybrid::HybridRetriever;
pub use keyword::KeywordRetriever;
pub use memory::{cosine_similarity, MemoryChunkStore};
pub use postgres::PgChunkStore;
pub use service::{ContentRetriever, RetrievalOptions};
pub use store::ChunkStore;
pub use vector::VectorRetriever;

use bouwrag_common::db::models::ChunkRecord;
use bouwrag_common::errors::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Retrieved chunk with relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: Uuid,

    /// Project (tenant) the chunk belongs to
    pub project_id: Uuid,

    pub file_id: Uuid,

    /// Raw chunk text, including table and summary markers
    pub text: String,

    /// Position within the source document
    pub chunk_index: i32,

    pub source_file: String,

    pub page_number: Option<i32>,

    pub section_title: Option<String>,

    /// Cosine similarity in [0, 1], or the fused RRF score for hybrid
    /// results without a vector score
    pub similarity: f32,

    /// Retrieval mode used
    pub retrieval_mode: RetrievalMode,

    #[serde(default)]
    pub metadata: ChunkMetadata,
}

/// Scores and provenance attached during retrieval
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Multi-hop iteration that found the chunk (0 = original query)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hop_number: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrf_score: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_similarity: Option<f32>,

    /// Similarity after the hop-decay penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_score: Option<f32>,
}

impl RetrievedChunk {
    /// Build from a stored chunk and its score
    pub fn from_record(record: &ChunkRecord, similarity: f32, mode: RetrievalMode) -> Self {
        Self {
            chunk_id: record.id,
            project_id: record.project_id,
            file_id: record.file_id,
            text: record.text.clone(),
            chunk_index: record.chunk_index,
            source_file: record.source_file.clone(),
            page_number: record.page_number,
            section_title: record.section_title.clone(),
            similarity,
            retrieval_mode: mode,
            metadata: ChunkMetadata::default(),
        }
    }

    /// Short provenance label, e.g. `bouwbesluit.pdf, p. 12 (Afdeling 4.2)`
    pub fn source_label(&self) -> String {
        let mut label = self.source_file.clone();
        if let Some(page) = self.page_number {
            label.push_str(&format!(", p. {}", page));
        }
        if let Some(section) = self.section_title.as_deref().filter(|s| !s.is_empty()) {
            label.push_str(&format!(" ({})", section));
        }
        label
    }
}

/// Retrieval mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Vector similarity search
    Vector,
    /// Full-text keyword search
    Keyword,
    /// Combined hybrid search
    Hybrid,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Vector => "vector",
            RetrievalMode::Keyword => "keyword",
            RetrievalMode::Hybrid => "hybrid",
        }
    }

    /// Whether the mode needs a query embedding
    pub fn uses_embedding(&self) -> bool {
        !matches!(self, RetrievalMode::Keyword)
    }
}

/// Search request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Project ID for tenant isolation
    pub project_id: Uuid,

    /// Query text
    pub query: String,

    /// Query embedding (for vector and hybrid search)
    pub query_embedding: Option<Vec<f32>>,

    /// Retrieval mode
    pub mode: RetrievalMode,

    /// Maximum results to return
    pub limit: usize,

    /// Minimum similarity threshold
    pub min_score: Option<f32>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            project_id: Uuid::nil(),
            query: String::new(),
            query_embedding: None,
            mode: RetrievalMode::Hybrid,
            limit: 5,
            min_score: Some(0.7),
        }
    }
}

/// Common trait for all retrievers
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve chunks matching the query
    async fn retrieve(&self, request: &SearchRequest) -> Result<Vec<RetrievedChunk>>;

    /// Get the retrieval mode
    fn mode(&self) -> RetrievalMode;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_label() {
        let record = ChunkRecord {
            id: Uuid::nil(),
            project_id: Uuid::nil(),
            file_id: Uuid::nil(),
            chunk_index: 3,
            text: String::new(),
            source_file: "bouwbesluit.pdf".into(),
            page_number: Some(12),
            section_title: Some("Afdeling 4.2".into()),
            embedding: vec![],
        };
        let chunk = RetrievedChunk::from_record(&record, 0.9, RetrievalMode::Vector);
        assert_eq!(chunk.source_label(), "bouwbesluit.pdf, p. 12 (Afdeling 4.2)");
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&RetrievalMode::Keyword).unwrap(),
            "\"keyword\""
        );
        assert!(!RetrievalMode::Keyword.uses_embedding());
        assert!(RetrievalMode::Hybrid.uses_embedding());
    }
}

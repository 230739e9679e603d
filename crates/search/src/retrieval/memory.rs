//! In-memory [`ChunkStore`] for tests and local development.
//!
//! Vector search is brute-force cosine similarity over all stored vectors.
//! Keyword search scores chunks by query-term occurrences, normalised the
//! same way as the Postgres text rank.

use super::{ChunkStore, RetrievalMode, RetrievedChunk};
use async_trait::async_trait;
use bouwrag_common::db::models::ChunkRecord;
use bouwrag_common::errors::Result;
use std::cmp::Ordering;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory chunk store
pub struct MemoryChunkStore {
    chunks: RwLock<Vec<ChunkRecord>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }

    pub async fn insert_many(&self, records: impl IntoIterator<Item = ChunkRecord>) {
        self.chunks.write().await.extend(records);
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cosine similarity; 0.0 for mismatched or zero-length vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// Lowercased terms; dots inside numbers are kept so `4.162` stays one term
fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '.'))
        .map(|t| t.trim_matches('.').to_lowercase())
        .filter(|t| t.chars().count() >= 2)
        .collect()
}

fn keyword_score(query_terms: &[String], text: &str) -> f32 {
    let chunk_terms = terms(text);
    let hits = query_terms
        .iter()
        .map(|q| chunk_terms.iter().filter(|t| *t == q).count())
        .sum::<usize>() as f32;
    hits / (hits + 1.0)
}

fn by_score_desc(a: &RetrievedChunk, b: &RetrievedChunk) -> Ordering {
    b.similarity
        .partial_cmp(&a.similarity)
        .unwrap_or(Ordering::Equal)
        .then(a.chunk_index.cmp(&b.chunk_index))
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn vector_search(
        &self,
        project_id: Uuid,
        embedding: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<RetrievedChunk>> {
        let chunks = self.chunks.read().await;
        let mut results: Vec<RetrievedChunk> = chunks
            .iter()
            .filter(|c| c.project_id == project_id)
            .filter_map(|c| {
                let similarity = cosine_similarity(embedding, &c.embedding);
                (similarity >= min_similarity)
                    .then(|| RetrievedChunk::from_record(c, similarity, RetrievalMode::Vector))
            })
            .collect();

        results.sort_by(by_score_desc);
        results.truncate(limit);
        Ok(results)
    }

    async fn keyword_search(
        &self,
        project_id: Uuid,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(vec![]);
        }

        let chunks = self.chunks.read().await;
        let mut results: Vec<RetrievedChunk> = chunks
            .iter()
            .filter(|c| c.project_id == project_id)
            .filter_map(|c| {
                let score = keyword_score(&query_terms, &c.text);
                (score > 0.0).then(|| RetrievedChunk::from_record(c, score, RetrievalMode::Keyword))
            })
            .collect();

        results.sort_by(by_score_desc);
        results.truncate(limit);
        Ok(results)
    }

    async fn chunk_embedding(&self, project_id: Uuid, chunk_id: Uuid) -> Result<Option<Vec<f32>>> {
        let chunks = self.chunks.read().await;
        Ok(chunks
            .iter()
            .find(|c| c.project_id == project_id && c.id == chunk_id)
            .filter(|c| !c.embedding.is_empty())
            .map(|c| c.embedding.clone()))
    }

    async fn nearest_to_chunk(
        &self,
        project_id: Uuid,
        chunk_id: Uuid,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let chunks = self.chunks.read().await;
        let mut results: Vec<RetrievedChunk> = chunks
            .iter()
            .filter(|c| c.project_id == project_id && c.id != chunk_id)
            .map(|c| {
                let similarity = cosine_similarity(embedding, &c.embedding);
                RetrievedChunk::from_record(c, similarity, RetrievalMode::Vector)
            })
            .collect();

        results.sort_by(by_score_desc);
        results.truncate(limit);
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

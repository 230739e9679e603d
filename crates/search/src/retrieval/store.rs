//! Storage seam for chunk retrieval

use super::RetrievedChunk;
use async_trait::async_trait;
use bouwrag_common::errors::Result;
use uuid::Uuid;

/// Read-only access to a project's embedded chunks.
///
/// Every method is scoped by `project_id`; implementations must never return
/// a chunk belonging to another project.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Chunks with cosine similarity `>= min_similarity`, most similar first
    async fn vector_search(
        &self,
        project_id: Uuid,
        embedding: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Chunks matching the query text, highest text rank first
    async fn keyword_search(
        &self,
        project_id: Uuid,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Stored embedding of one chunk, `None` when the chunk is unknown or
    /// has no embedding
    async fn chunk_embedding(&self, project_id: Uuid, chunk_id: Uuid) -> Result<Option<Vec<f32>>>;

    /// Nearest neighbours of `embedding`, excluding `chunk_id` itself
    async fn nearest_to_chunk(
        &self,
        project_id: Uuid,
        chunk_id: Uuid,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

//! Reciprocal Rank Fusion (RRF) for combining search results
//!
//! `score(d) = Σ 1 / (k + rank)` over every list containing `d`, with
//! `rank` the 0-based position in that list. RRF:
//! - Doesn't require score normalization
//! - Works well with different scoring distributions
//! - Is robust to outliers

use super::{RetrievalMode, RetrievedChunk};
use std::collections::HashMap;
use uuid::Uuid;

/// RRF fusion parameters
#[derive(Debug, Clone)]
pub struct RRFusion {
    /// Constant k (typically 60)
    pub k: f32,
}

impl Default for RRFusion {
    fn default() -> Self {
        Self {
            k: 60.0,
        }
    }
}

/// Result of fusion
#[derive(Debug, Clone)]
pub struct FusionResult {
    pub chunk: RetrievedChunk,
    pub vector_rank: Option<usize>,
    pub keyword_rank: Option<usize>,
    /// Cosine similarity from the vector list, when the chunk appeared there
    pub vector_similarity: Option<f32>,
    pub rrf_score: f32,
}

impl RRFusion {
    /// Create with a custom `k`
    pub fn with_k(k: f32) -> Self {
        Self { k }
    }

    /// Fuse vector and keyword results using RRF, best first
    pub fn fuse(
        &self,
        vector_results: Vec<RetrievedChunk>,
        keyword_results: Vec<RetrievedChunk>,
        limit: usize,
    ) -> Vec<FusionResult> {
        // chunk_id -> (chunk, vector_rank, keyword_rank, vector_similarity), first-seen order kept
        let mut order: Vec<Uuid> = Vec::new();
        let mut chunk_map: HashMap<Uuid, (RetrievedChunk, Option<usize>, Option<usize>, Option<f32>)> =
            HashMap::new();

        for (rank, chunk) in vector_results.into_iter().enumerate() {
            if chunk_map.contains_key(&chunk.chunk_id) {
                continue;
            }
            order.push(chunk.chunk_id);
            let similarity = chunk.similarity;
            chunk_map.insert(chunk.chunk_id, (chunk, Some(rank), None, Some(similarity)));
        }

        for (rank, chunk) in keyword_results.into_iter().enumerate() {
            match chunk_map.get_mut(&chunk.chunk_id) {
                Some((_, _, keyword_rank, _)) => {
                    if keyword_rank.is_none() {
                        *keyword_rank = Some(rank);
                    }
                }
                None => {
                    order.push(chunk.chunk_id);
                    chunk_map.insert(chunk.chunk_id, (chunk, None, Some(rank), None));
                }
            }
        }

        let mut results: Vec<FusionResult> = order
            .into_iter()
            .filter_map(|id| chunk_map.remove(&id))
            .map(|(mut chunk, vector_rank, keyword_rank, vector_similarity)| {
                let vector_rrf = vector_rank
                    .map(|r| 1.0 / (self.k + r as f32))
                    .unwrap_or(0.0);

                let keyword_rrf = keyword_rank
                    .map(|r| 1.0 / (self.k + r as f32))
                    .unwrap_or(0.0);

                let rrf_score = vector_rrf + keyword_rrf;

                chunk.retrieval_mode = RetrievalMode::Hybrid;
                chunk.similarity = vector_similarity.unwrap_or(rrf_score);
                chunk.metadata.rrf_score = Some(rrf_score);
                chunk.metadata.vector_similarity = vector_similarity;

                FusionResult {
                    chunk,
                    vector_rank,
                    keyword_rank,
                    vector_similarity,
                    rrf_score,
                }
            })
            .collect();

        // stable sort keeps vector order on ties
        results.sort_by(|a, b| {
            b.rrf_score
                .partial_cmp(&a.rrf_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        results.truncate(limit);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::test_support::record;

    fn chunk(text: &str, similarity: f32, mode: RetrievalMode) -> RetrievedChunk {
        RetrievedChunk::from_record(&record(Uuid::nil(), 0, text, vec![]), similarity, mode)
    }

    #[test]
    fn test_rrf_scores() {
        let a = chunk("a", 0.9, RetrievalMode::Vector);
        let b = chunk("b", 0.8, RetrievalMode::Vector);
        let mut a_kw = chunk("a", 0.4, RetrievalMode::Keyword);
        a_kw.chunk_id = a.chunk_id;

        let fused = RRFusion::default().fuse(vec![a.clone(), b.clone()], vec![a_kw], 10);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].chunk.chunk_id, a.chunk_id);
        assert!((fused[0].rrf_score - 2.0 / 60.0).abs() < 1e-6);
        assert!((fused[1].rrf_score - 1.0 / 61.0).abs() < 1e-6);
        assert_eq!(fused[0].chunk.similarity, 0.9);
        assert_eq!(fused[0].chunk.metadata.rrf_score, Some(fused[0].rrf_score));
    }

    #[test]
    fn test_keyword_only_chunk_uses_fused_score() {
        let kw = chunk("kw", 0.7, RetrievalMode::Keyword);
        let fused = RRFusion::default().fuse(vec![], vec![kw], 10);
        assert_eq!(fused[0].vector_similarity, None);
        assert!((fused[0].chunk.similarity - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(fused[0].chunk.retrieval_mode, RetrievalMode::Hybrid);
    }

    #[test]
    fn test_single_list_keeps_order() {
        let vector: Vec<RetrievedChunk> = (0..5)
            .map(|i| chunk(&format!("c{}", i), 1.0 - i as f32 * 0.1, RetrievalMode::Vector))
            .collect();
        let ids: Vec<Uuid> = vector.iter().map(|c| c.chunk_id).collect();
        let fused = RRFusion::default().fuse(vector, vec![], 3);
        let fused_ids: Vec<Uuid> = fused.iter().map(|r| r.chunk.chunk_id).collect();
        assert_eq!(fused_ids, ids[..3].to_vec());
    }
}

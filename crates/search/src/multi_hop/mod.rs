//! Multi-hop retrieval
//!
//! Expands an initial retrieval by following article and table references
//! found in the retrieved text:
//! - hop 0 runs the original query with a loose threshold
//! - every later hop queries each unresolved reference found in the chunks
//!   the previous hop added
//! - the loop stops at `max_hops`, or earlier when a hop has no reference
//!   left to follow or adds no new chunk
//!
//! Results are deduplicated by chunk id and re-ranked with a hop-decay
//! penalty so directly relevant chunks outrank reference-chased material.

mod references;

pub use references::{LegalReferenceDetector, Reference, ReferenceDetector, ReferenceKind};

use crate::retrieval::{ContentRetriever, RetrievalOptions, RetrievedChunk};
use bouwrag_common::config::MultiHopConfig;
use bouwrag_common::errors::Result;
use bouwrag_common::metrics;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Options for one multi-hop run; unset fields use the configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiHopOptions {
    pub project_id: Uuid,
    pub query: String,
    pub max_hops: Option<usize>,
    /// Results for the original query
    pub top_k: Option<usize>,
    pub similarity_threshold: Option<f32>,
    /// Results per reference query
    pub hop_top_k: Option<usize>,
}

impl MultiHopOptions {
    pub fn new(project_id: Uuid, query: impl Into<String>) -> Self {
        Self {
            project_id,
            query: query.into(),
            ..Self::default()
        }
    }
}

/// What one hop asked for and found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopRecord {
    pub hop_number: usize,
    pub queries: Vec<String>,
    pub new_chunks: usize,
}

/// Chunks plus the per-hop trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiHopOutcome {
    pub chunks: Vec<RetrievedChunk>,
    pub hops: Vec<HopRecord>,
}

/// Reference-following retriever
pub struct MultiHopRetriever {
    retriever: Arc<ContentRetriever>,
    detector: Arc<dyn ReferenceDetector>,
    config: MultiHopConfig,
}

impl MultiHopRetriever {
    /// Create with the Bouwbesluit reference detector
    pub fn new(retriever: Arc<ContentRetriever>, config: MultiHopConfig) -> Self {
        Self::with_detector(retriever, Arc::new(LegalReferenceDetector), config)
    }

    pub fn with_detector(
        retriever: Arc<ContentRetriever>,
        detector: Arc<dyn ReferenceDetector>,
        config: MultiHopConfig,
    ) -> Self {
        Self {
            retriever,
            detector,
            config,
        }
    }

    /// Run multi-hop retrieval and return the re-ranked chunks
    pub async fn multi_hop_retrieve(&self, options: &MultiHopOptions) -> Result<Vec<RetrievedChunk>> {
        Ok(self.retrieve_with_trace(options).await?.chunks)
    }

    /// Run multi-hop retrieval and keep the per-hop trace
    pub async fn retrieve_with_trace(&self, options: &MultiHopOptions) -> Result<MultiHopOutcome> {
        let start = Instant::now();
        let max_hops = options.max_hops.unwrap_or(self.config.max_hops).max(1);
        let top_k = options.top_k.unwrap_or(self.config.top_k);
        let hop_top_k = options.hop_top_k.unwrap_or(self.config.hop_top_k);
        let threshold = options
            .similarity_threshold
            .unwrap_or(self.config.similarity_threshold);

        let initial = self
            .retriever
            .find_relevant_content(
                &RetrievalOptions::new(options.project_id, options.query.clone())
                    .top_k(top_k)
                    .similarity_threshold(threshold),
            )
            .await?;

        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut collected: Vec<RetrievedChunk> = Vec::new();
        for mut chunk in initial {
            if seen.insert(chunk.chunk_id) {
                chunk.metadata.hop_number = Some(0);
                collected.push(chunk);
            }
        }

        let mut hops = vec![HopRecord {
            hop_number: 0,
            queries: vec![options.query.clone()],
            new_chunks: collected.len(),
        }];

        let mut followed: HashSet<Reference> = HashSet::new();
        let mut frontier_start = 0;

        for hop in 1..max_hops {
            let pending = self.unresolved_references(&collected[frontier_start..], &collected, &followed);
            if pending.is_empty() {
                debug!(hop, "No unresolved references left");
                break;
            }

            let mut queries = Vec::with_capacity(pending.len());
            let mut new_chunks = Vec::new();

            for reference in pending {
                let query = reference.query();
                followed.insert(reference);

                let results = self
                    .retriever
                    .find_relevant_content(
                        &RetrievalOptions::new(options.project_id, query.clone())
                            .top_k(hop_top_k)
                            .similarity_threshold(threshold),
                    )
                    .await?;

                for mut chunk in results {
                    if seen.insert(chunk.chunk_id) {
                        chunk.metadata.hop_number = Some(hop);
                        new_chunks.push(chunk);
                    }
                }
                queries.push(query);
            }

            debug!(hop, queries = ?queries, new_chunks = new_chunks.len(), "Hop completed");
            hops.push(HopRecord {
                hop_number: hop,
                queries,
                new_chunks: new_chunks.len(),
            });

            if new_chunks.is_empty() {
                break;
            }
            frontier_start = collected.len();
            collected.extend(new_chunks);
        }

        let chunks = rerank(collected, self.config.hop_decay);

        metrics::record_multi_hop(hops.len(), chunks.len());
        tracing::info!(
            project_id = %options.project_id,
            hops = hops.len(),
            results = chunks.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Multi-hop retrieval completed"
        );

        Ok(MultiHopOutcome { chunks, hops })
    }

    /// References in `frontier` not yet followed and not satisfied by any
    /// collected chunk
    fn unresolved_references(
        &self,
        frontier: &[RetrievedChunk],
        collected: &[RetrievedChunk],
        followed: &HashSet<Reference>,
    ) -> Vec<Reference> {
        let mut pending: Vec<Reference> = Vec::new();
        for chunk in frontier {
            for reference in self.detector.detect_references(&chunk.text) {
                if followed.contains(&reference) || pending.contains(&reference) {
                    continue;
                }
                if collected
                    .iter()
                    .any(|c| self.detector.is_resolved_by(&reference, c))
                {
                    continue;
                }
                pending.push(reference);
            }
        }
        pending
    }
}

/// Apply `similarity / (1 + hop * decay)` and sort best first
fn rerank(mut chunks: Vec<RetrievedChunk>, decay: f32) -> Vec<RetrievedChunk> {
    for chunk in &mut chunks {
        let hop = chunk.metadata.hop_number.unwrap_or(0) as f32;
        chunk.metadata.adjusted_score = Some(chunk.similarity / (1.0 + hop * decay));
    }
    chunks.sort_by(|a, b| {
        let a = a.metadata.adjusted_score.unwrap_or(a.similarity);
        let b = b.metadata.adjusted_score.unwrap_or(b.similarity);
        b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
    });
    chunks
}

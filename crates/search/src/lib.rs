//! bouwrag search
//!
//! Retrieval over project document chunks:
//! - Vector, keyword and hybrid (RRF) retrieval through a [`retrieval::ChunkStore`]
//! - Multi-hop retrieval that follows article and table cross-references

pub mod multi_hop;
pub mod retrieval;

pub use multi_hop::{
    HopRecord, LegalReferenceDetector, MultiHopOptions, MultiHopOutcome, MultiHopRetriever,
    Reference, ReferenceDetector, ReferenceKind,
};
pub use retrieval::{
    ChunkMetadata, ChunkStore, ContentRetriever, MemoryChunkStore, PgChunkStore, RetrievalMode,
    RetrievalOptions, RetrievedChunk,
};

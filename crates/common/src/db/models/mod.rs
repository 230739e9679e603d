//! Chunk row types
//!
//! Only the chunk table is read by this service; it is populated by the
//! document ingestion pipeline.

mod chunk;

pub use chunk::{format_embedding, parse_embedding, ChunkRecord};

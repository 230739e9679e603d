//! bouwrag Common Library
//!
//! Shared code for the bouwrag services including:
//! - Configuration management
//! - Error types and handling
//! - Database pool and the chunk record
//! - Embedding and chat model clients
//! - Table-aware chunk formatting
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod format;
pub mod llm;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use llm::ChatModel;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

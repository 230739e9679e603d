//! Configuration management for bouwrag services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chat model configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Single-shot retrieval defaults
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Multi-hop retrieval defaults
    #[serde(default)]
    pub multi_hop: MultiHopConfig,

    /// Reasoning agent defaults
    #[serde(default)]
    pub agent: AgentConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension; must match the stored chunk embeddings
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Chat provider: openai, mock
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key
    pub api_key: Option<String>,

    /// Chat completions endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per turn
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,

    /// Timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_enabled")]
    pub use_hybrid_search: bool,

    /// RRF constant
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    /// PostgreSQL text search configuration used for keyword ranking
    #[serde(default = "default_text_search_config")]
    pub text_search_config: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MultiHopConfig {
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// Hop-0 result count
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_multi_hop_threshold")]
    pub similarity_threshold: f32,

    /// Result count for each follow-up reference query
    #[serde(default = "default_hop_top_k")]
    pub hop_top_k: usize,

    /// Score penalty per hop: score * 1 / (1 + hop * decay)
    #[serde(default = "default_hop_decay")]
    pub hop_decay: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Chunks shown to the model per search call
    #[serde(default = "default_preview_chunks")]
    pub preview_chunks: usize,

    /// Characters per chunk in a search preview
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Chunks fed to the synthesis fallback
    #[serde(default = "default_preview_chunks")]
    pub synthesis_chunks: usize,

    /// Characters per chunk in the synthesis prompt
    #[serde(default = "default_synthesis_chars")]
    pub synthesis_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_enabled")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_database_url() -> String { "postgres://localhost/bouwrag".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_llm_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_llm_model() -> String { "gpt-4o".to_string() }
fn default_llm_temperature() -> f32 { 0.2 }
fn default_llm_max_tokens() -> usize { 2000 }
fn default_llm_timeout() -> u64 { 60 }
fn default_top_k() -> usize { 5 }
fn default_similarity_threshold() -> f32 { 0.7 }
fn default_rrf_k() -> f32 { 60.0 }
fn default_text_search_config() -> String { "dutch".to_string() }
fn default_max_hops() -> usize { 3 }
fn default_multi_hop_threshold() -> f32 { 0.3 }
fn default_hop_top_k() -> usize { 3 }
fn default_hop_decay() -> f32 { 0.3 }
fn default_max_steps() -> usize { 5 }
fn default_preview_chunks() -> usize { 5 }
fn default_preview_chars() -> usize { 800 }
fn default_synthesis_chars() -> usize { 1500 }
fn default_log_level() -> String { "info".to_string() }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "bouwrag".to_string() }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            read_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            use_hybrid_search: default_enabled(),
            rrf_k: default_rrf_k(),
            text_search_config: default_text_search_config(),
        }
    }
}

impl Default for MultiHopConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            top_k: default_top_k(),
            similarity_threshold: default_multi_hop_threshold(),
            hop_top_k: default_hop_top_k(),
            hop_decay: default_hop_decay(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            preview_chunks: default_preview_chunks(),
            preview_chars: default_preview_chars(),
            synthesis_chunks: default_preview_chunks(),
            synthesis_chars: default_synthesis_chars(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_enabled(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__RETRIEVAL__TOP_K=8
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            multi_hop: MultiHopConfig::default(),
            agent: AgentConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.similarity_threshold - 0.7).abs() < f32::EPSILON);
        assert!((config.multi_hop.similarity_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.multi_hop.max_hops, 3);
        assert_eq!(config.multi_hop.hop_top_k, 3);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("agent.max_steps", 3)
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize())
            .unwrap();

        assert_eq!(config.agent.max_steps, 3);
        assert_eq!(config.agent.preview_chunks, 5);
        assert_eq!(config.retrieval.text_search_config, "dutch");
    }
}

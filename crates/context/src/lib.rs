//! bouwrag context engine
//!
//! The legal RAG agent: a bounded, tool-calling reasoning loop that searches
//! the Bouwbesluit corpus through multi-hop retrieval and answers with cited
//! sources and a confidence label.

pub mod agent;

pub use agent::{AgentQueryOptions, AgentResult, AgentStep, Confidence, LegalRagAgent};

//! Processed document chunk with its embedding
//!
//! Rows live in `project_doc_chunks`; the `embedding` column is pgvector and
//! crosses the SQL boundary as its text literal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parse a pgvector literal such as `[1.0,2.0,3.0]`
pub fn parse_embedding(raw: &str) -> Option<Vec<f32>> {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    if inner.trim().is_empty() {
        return None;
    }
    inner
        .split(',')
        .map(|v| v.trim().parse::<f32>().ok())
        .collect()
}

/// Render an embedding as a pgvector literal
pub fn format_embedding(embedding: &[f32]) -> String {
    format!(
        "[{}]",
        embedding
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// A chunk together with its decoded embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: Uuid,
    /// Tenant key; every read is scoped by it
    pub project_id: Uuid,
    pub file_id: Uuid,
    /// Position within the source document
    pub chunk_index: i32,
    pub text: String,
    pub source_file: String,
    pub page_number: Option<i32>,
    pub section_title: Option<String>,
    pub embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_format() {
        let embedding = vec![0.1, 0.2, 0.3];
        assert_eq!(format_embedding(&embedding), "[0.1,0.2,0.3]");
    }

    #[test]
    fn test_parse_embedding() {
        assert_eq!(parse_embedding("[1, 2.5,-3]"), Some(vec![1.0, 2.5, -3.0]));
        assert_eq!(parse_embedding("[]"), None);
        assert_eq!(parse_embedding("[1,x]"), None);
    }
}

//! Source previews and the synthesis fallback context

use bouwrag_common::format::{format_rag_context_for_prompt, format_rag_table_content, ContextSource};
use bouwrag_search::RetrievedChunk;
use std::cmp::Ordering;

/// Cut `text` to at most `max_chars` characters, marking the cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

fn ranking_score(chunk: &RetrievedChunk) -> f32 {
    chunk.metadata.adjusted_score.unwrap_or(chunk.similarity)
}

/// Best chunks first, by hop-adjusted score
pub fn top_chunks(chunks: &[RetrievedChunk], limit: usize) -> Vec<&RetrievedChunk> {
    let mut ranked: Vec<&RetrievedChunk> = chunks.iter().collect();
    ranked.sort_by(|a, b| {
        ranking_score(b)
            .partial_cmp(&ranking_score(a))
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}

/// Observation returned to the model for a search.
///
/// Shows the first `limit` chunks in retrieval order, each formatted as
/// Markdown and truncated.
pub fn format_preview(chunks: &[RetrievedChunk], limit: usize, max_chars: usize) -> String {
    let mut out = format!("{} resultaten gevonden.\n", chunks.len());
    for (i, chunk) in chunks.iter().take(limit).enumerate() {
        let formatted = format_rag_table_content(&chunk.text);
        let mut body = formatted.text;
        if !formatted.summaries.is_empty() {
            body = format!("{}\n{}", formatted.summaries.join(" "), body);
        }
        out.push_str(&format!(
            "\n[{}] {} (relevantie {:.2})\n{}\n",
            i + 1,
            chunk.source_label(),
            ranking_score(chunk),
            truncate_chars(&body, max_chars)
        ));
    }
    out
}

/// Prompt context from the best gathered sources.
///
/// Each source is formatted before it is cut to `max_chars`, so tables are
/// shortened by whole rows.
pub fn synthesis_context(sources: &[RetrievedChunk], limit: usize, max_chars: usize) -> String {
    let context_sources: Vec<ContextSource> = top_chunks(sources, limit)
        .into_iter()
        .map(|chunk| ContextSource {
            label: chunk.source_label(),
            text: chunk.text.clone(),
        })
        .collect();
    format_rag_context_for_prompt(&context_sources, max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bouwrag_common::db::models::ChunkRecord;
    use bouwrag_search::RetrievalMode;
    use uuid::Uuid;

    fn chunk(text: &str, similarity: f32) -> RetrievedChunk {
        let record = ChunkRecord {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            file_id: Uuid::nil(),
            chunk_index: 0,
            text: text.into(),
            source_file: "bouwbesluit.pdf".into(),
            page_number: Some(4),
            section_title: None,
            embedding: vec![],
        };
        RetrievedChunk::from_record(&record, similarity, RetrievalMode::Vector)
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("ruimte hoogte", 6), "ruimte...");
        assert_eq!(truncate_chars("éééé", 2), "éé...");
    }

    #[test]
    fn test_preview_limits_chunks() {
        let chunks: Vec<RetrievedChunk> = (0..7).map(|i| chunk(&format!("tekst {}", i), 0.9)).collect();
        let preview = format_preview(&chunks, 5, 100);
        assert!(preview.starts_with("7 resultaten gevonden."));
        assert!(preview.contains("[5] bouwbesluit.pdf, p. 4"));
        assert!(!preview.contains("[6]"));
    }

    #[test]
    fn test_synthesis_context_takes_best_sources() {
        let sources = vec![chunk("zwak", 0.2), chunk("sterk", 0.9), chunk("middel", 0.5)];
        let context = synthesis_context(&sources, 2, 100);
        assert!(context.contains("sterk"));
        assert!(context.contains("middel"));
        assert!(!context.contains("zwak"));
        assert!(context.find("sterk") < context.find("middel"));
    }

    #[test]
    fn test_synthesis_context_keeps_table_rows_whole() {
        let mut text = String::from("| Functie | Hoogte |\n| --- | --- |\n");
        for i in 0..30 {
            text.push_str(&format!("| gebruiksfunctie {} | {},6 m |\n", i, i));
        }
        let context = synthesis_context(&[chunk(&text, 0.9)], 1, 150);

        let rows: Vec<&str> = context.lines().filter(|l| l.starts_with('|')).collect();
        assert!(rows[0].contains("Functie"));
        assert!(rows.iter().all(|l| l.ends_with('|')));
        assert!(context.ends_with("..."));
    }
}

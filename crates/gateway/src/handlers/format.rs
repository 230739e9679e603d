//! Chunk formatting handler

use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_request;
use bouwrag_common::errors::Result;
use bouwrag_common::format::{format_rag_table_content, FormattedRagContent};

#[derive(Debug, Deserialize, Validate)]
pub struct FormatRequest {
    #[validate(length(max = 200000))]
    pub text: String,
}

#[derive(Serialize)]
pub struct FormatResponse {
    #[serde(flatten)]
    pub content: FormattedRagContent,
    /// Source-viewer HTML
    pub source_html: String,
}

/// Render raw chunk text as Markdown and HTML
pub async fn format(Json(request): Json<FormatRequest>) -> Result<Json<FormatResponse>> {
    validate_request(&request)?;

    let content = format_rag_table_content(&request.text);
    Ok(Json(FormatResponse {
        source_html: content.html.clone(),
        content,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_formats_pipe_table() {
        let text = "Tabel 4.162\n| Functie | Hoogte |\n| --- | --- |\n| woonfunctie | 2,6 m |";
        let Json(response) = format(Json(FormatRequest { text: text.to_string() }))
            .await
            .unwrap();

        assert!(response.content.has_table);
        assert_eq!(response.content.tables.len(), 1);
        assert!(response.content.html.contains("<table"));
        assert!(response.source_html.contains("woonfunctie"));
    }

    #[tokio::test]
    async fn test_source_html_matches_standalone_render() {
        let text = "--- Tabel Samenvatting ---\n\"Minimaal 2,6 m.\"\n| A | B | | --- | --- | | 1 | 2 | | 3 | 4 |";
        let Json(response) = format(Json(FormatRequest { text: text.to_string() }))
            .await
            .unwrap();

        assert_eq!(response.source_html, response.content.html);
        assert_eq!(response.source_html, bouwrag_common::format::format_rag_source_text(text));
    }

    #[tokio::test]
    async fn test_empty_text_is_not_an_error() {
        let Json(response) = format(Json(FormatRequest { text: String::new() })).await.unwrap();
        assert!(!response.content.has_table);
        assert!(response.content.tables.is_empty());
    }
}

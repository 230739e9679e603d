//! Table-aware formatting of chunk text
//!
//! Chunks produced from the Bouwbesluit PDFs carry tables that were
//! flattened during extraction, semantic summary sections, and layout
//! noise (page numbers, version stamps). This module turns that text into
//! Markdown for prompts and styled HTML for the UI.
//!
//! Formatting never fails: any span that cannot be parsed is passed through
//! as literal text.

pub mod render;
pub mod table;

pub use render::{escape_html, table_to_html, table_to_markdown};
pub use table::{normalize_columns, parse_pipe_table, ParsedTable};

use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static SUMMARY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)---[ \t]*tabel samenvatting[^\n]*?---").unwrap());

static DETAILS_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)---[ \t]*tabel details[ \t]*---").unwrap());

/// Any `--- ... ---` marker line; ends the current section
static SECTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*---[^\n]*?---[ \t]*$").unwrap());

static INLINE_SUMMARY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*samenvatting:[ \t]*").unwrap());

static QUOTED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[-*]?[ \t]*"(.+)"[,.]?$"#).unwrap());

static QUOTED_ANY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"\n]{3,})""#).unwrap());

static TABLE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{TABLE_(\d+)\}\}").unwrap());

/// Year, page and date stamps left behind by page footers,
/// e.g. `2018 291 31-08-2018 03-07-2018`
static DATE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}[ \t]+\d{1,5}[ \t]+\d{2}-\d{2}-\d{4}(?:[ \t]+\d{2}-\d{2}-\d{4})*").unwrap()
});

/// Orphaned unit brackets such as `[m 2 ]`
static UNIT_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[ \t]*[a-zA-Z]{1,3}[ \t]*\d?[ \t]*\]").unwrap());

static BARE_INTEGER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+[ \t]*$").unwrap());

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Minimum number of alphanumeric characters for a `Samenvatting:` line to
/// count as a summary
const MIN_SUMMARY_CHARS: usize = 10;

const SUMMARY_BOX_STYLE: &str = "background-color: #eff6ff; border-left: 3px solid #3b82f6; padding: 8px 12px; margin-bottom: 0.75rem;";
const PARAGRAPH_STYLE: &str = "margin: 0 0 0.5rem 0;";

/// Result of formatting one chunk's text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattedRagContent {
    /// Cleaned text with tables rendered as Markdown
    pub text: String,
    /// Same content rendered as styled HTML, summaries first
    pub html: String,
    /// Semantic summary sentences pulled out of the text
    pub summaries: Vec<String>,
    pub tables: Vec<ParsedTable>,
    pub has_table: bool,
}

/// One source handed to [`format_rag_context_for_prompt`]
#[derive(Debug, Clone)]
pub struct ContextSource {
    /// Heading for the source, e.g. file name and page
    pub label: String,
    pub text: String,
}

/// Format a chunk's raw text into Markdown, HTML and summaries
pub fn format_rag_table_content(text: &str) -> FormattedRagContent {
    let (summaries, remaining) = extract_summaries(text);

    let mut tables = Vec::new();
    // a Details table already holds the data; inline rows would duplicate it
    let remaining = match extract_details_table(&remaining, &mut tables) {
        Some(rewritten) => rewritten,
        None => extract_inline_tables(&remaining, &mut tables),
    };

    let cleaned = clean_artifacts(&remaining);

    let markdown = TABLE_TOKEN.replace_all(&cleaned, |caps: &Captures<'_>| {
        match table_for_token(caps, &tables) {
            Some(table) => format!("\n{}\n", table_to_markdown(table)),
            None => caps[0].to_string(),
        }
    });
    let markdown = BLANK_RUN.replace_all(&markdown, "\n\n").trim().to_string();

    let html = render_html(&summaries, &cleaned, &tables);

    FormattedRagContent {
        text: markdown,
        html,
        has_table: !tables.is_empty(),
        summaries,
        tables,
    }
}

/// Format a chunk's raw text as HTML for display
pub fn format_rag_source_text(text: &str) -> String {
    format_rag_table_content(text).html
}

/// Build prompt context from several sources.
///
/// Summaries are deduplicated across sources and emitted once in a
/// "Key Information from Tables" block ahead of the per-source text.
/// Each source's formatted text is cut to `max_chars` on a line boundary.
pub fn format_rag_context_for_prompt(sources: &[ContextSource], max_chars: usize) -> String {
    let mut seen = HashSet::new();
    let mut summaries = Vec::new();
    let mut sections = Vec::with_capacity(sources.len());

    for (i, source) in sources.iter().enumerate() {
        let formatted = format_rag_table_content(&source.text);
        for summary in formatted.summaries {
            if seen.insert(summary.clone()) {
                summaries.push(summary);
            }
        }
        sections.push(format!(
            "### [{}] {}\n{}",
            i + 1,
            source.label,
            truncate_lines(&formatted.text, max_chars)
        ));
    }

    let mut out = String::new();
    if !summaries.is_empty() {
        out.push_str("## Key Information from Tables\n");
        for summary in &summaries {
            out.push_str(&format!("- {}\n", summary));
        }
        out.push('\n');
    }
    out.push_str(&sections.join("\n\n"));
    out
}

/// Keep whole lines of `text` up to `max_chars` characters.
///
/// A `...` line marks the cut. An overlong first line is cut mid-line
/// rather than dropped.
pub fn truncate_lines(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut kept = Vec::new();
    let mut used = 0;
    for line in text.lines() {
        let len = line.chars().count() + 1;
        if used + len > max_chars {
            break;
        }
        used += len;
        kept.push(line);
    }

    if kept.is_empty() {
        let head: String = text.chars().take(max_chars).collect();
        return format!("{}...", head.trim_end());
    }
    format!("{}\n...", kept.join("\n"))
}

/// Pull semantic summary sentences out of `text`.
///
/// Returns the summaries and the text with the summary sections removed.
/// A section without any recognisable summary is left in place.
pub fn extract_summaries(text: &str) -> (Vec<String>, String) {
    let mut summaries = Vec::new();
    let mut remaining = text.to_string();
    let mut search_from = 0;

    while let Some(marker) = SUMMARY_MARKER.find_at(&remaining, search_from) {
        let body_end = section_end(&remaining, marker.end());
        let (found, leftover) = summaries_from_section(&remaining[marker.end()..body_end]);
        if found.is_empty() {
            search_from = body_end;
            continue;
        }
        summaries.extend(found);
        search_from = marker.start() + leftover.len();
        remaining = format!(
            "{}{}{}",
            &remaining[..marker.start()],
            leftover,
            &remaining[body_end..]
        );
    }

    if let Some((found, rewritten)) = extract_inline_summaries(&remaining) {
        summaries.extend(found);
        remaining = rewritten;
    }

    (summaries, remaining)
}

fn section_end(text: &str, from: usize) -> usize {
    SECTION_MARKER
        .find_at(text, from)
        .map_or(text.len(), |m| m.start())
}

/// Quoted sentence per line first, any quoted substring as fallback.
/// Unquoted lines are handed back so no content is lost.
fn summaries_from_section(body: &str) -> (Vec<String>, String) {
    let mut found = Vec::new();
    let mut leftover = Vec::new();

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match QUOTED_LINE.captures(trimmed) {
            Some(caps) => found.push(caps[1].trim().to_string()),
            None => leftover.push(trimmed.to_string()),
        }
    }

    if found.is_empty() {
        found = QUOTED_ANY
            .captures_iter(body)
            .map(|caps| caps[1].trim().to_string())
            .collect();
        leftover = QUOTED_ANY
            .replace_all(body, "")
            .lines()
            .map(str::trim)
            .filter(|l| l.chars().any(char::is_alphanumeric))
            .map(str::to_string)
            .collect();
    }

    let leftover = if leftover.is_empty() {
        "\n".to_string()
    } else {
        format!("\n{}\n", leftover.join("\n"))
    };
    (found, leftover)
}

/// `Samenvatting:` followed by a block of lines, ended by a blank line
fn extract_inline_summaries(text: &str) -> Option<(Vec<String>, String)> {
    let marker = INLINE_SUMMARY_MARKER.find(text)?;
    let rest = &text[marker.end()..];

    let mut consumed = 0;
    let mut found = Vec::new();
    let mut leftover = Vec::new();

    for (idx, line) in rest.split_inclusive('\n').enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if idx == 0 {
                consumed += line.len();
                continue;
            }
            break;
        }
        if SECTION_MARKER.is_match(trimmed) || trimmed.contains('|') {
            break;
        }
        consumed += line.len();

        let cleaned = trimmed
            .trim_start_matches(['-', '*'])
            .trim()
            .trim_matches('"')
            .trim();
        if cleaned.chars().filter(|c| c.is_alphanumeric()).count() >= MIN_SUMMARY_CHARS {
            found.push(cleaned.to_string());
        } else {
            leftover.push(trimmed);
        }
    }

    if found.is_empty() {
        return None;
    }

    let mut rewritten = text[..marker.start()].to_string();
    if !leftover.is_empty() {
        rewritten.push_str(&leftover.join("\n"));
        rewritten.push('\n');
    }
    rewritten.push_str(&rest[consumed..]);
    Some((found, rewritten))
}

/// Replace the `--- Tabel Details ---` section with a table placeholder.
///
/// Returns `None` when there is no such section or its content does not
/// parse; the text is then left untouched.
fn extract_details_table(text: &str, tables: &mut Vec<ParsedTable>) -> Option<String> {
    let marker = DETAILS_MARKER.find(text)?;
    let body_end = section_end(text, marker.end());
    let body = &text[marker.end()..body_end];

    let mut table = parse_pipe_table(body)?;

    let mut literal: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.contains('|'))
        .collect();
    if table.is_headerless() {
        if let Some(pos) = literal
            .iter()
            .position(|line| apply_tab_headers(&mut table, line))
        {
            literal.remove(pos);
        }
    }

    let token = push_table(tables, table);
    let mut replacement = literal.join("\n");
    replacement.push('\n');
    replacement.push_str(&token);

    Some(format!(
        "{}\n{}\n{}",
        &text[..marker.start()],
        replacement,
        &text[body_end..]
    ))
}

/// Replace runs of pipe lines with table placeholders
fn extract_inline_tables(text: &str, tables: &mut Vec<ParsedTable>) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.contains('|') {
            buffer.push(line);
        } else {
            flush_table_buffer(&mut buffer, &mut out, tables);
            out.push(line.to_string());
        }
    }
    flush_table_buffer(&mut buffer, &mut out, tables);

    out.join("\n")
}

fn flush_table_buffer(buffer: &mut Vec<&str>, out: &mut Vec<String>, tables: &mut Vec<ParsedTable>) {
    if buffer.is_empty() {
        return;
    }

    let candidate = buffer.len() >= 2 || table::has_separator_run(buffer[0]);
    let parsed = if candidate {
        parse_pipe_table(&buffer.join("\n"))
    } else {
        None
    };

    match parsed {
        Some(mut table) => {
            // headers recovered from a tab-separated line just above the table
            if table.is_headerless()
                && out
                    .last()
                    .is_some_and(|prev| apply_tab_headers(&mut table, prev))
            {
                out.pop();
            }
            out.push(push_table(tables, table));
        }
        None => out.extend(buffer.iter().map(|l| l.to_string())),
    }
    buffer.clear();
}

fn push_table(tables: &mut Vec<ParsedTable>, table: ParsedTable) -> String {
    tables.push(table);
    format!("{{{{TABLE_{}}}}}", tables.len() - 1)
}

fn tab_separated_headers(line: &str) -> Option<Vec<String>> {
    if !line.contains('\t') {
        return None;
    }
    let fields: Vec<String> = line
        .split('\t')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    (fields.len() >= 2).then_some(fields)
}

/// Use a tab-separated line as headers for a headerless table.
/// Returns false when the line does not fit the table.
fn apply_tab_headers(table: &mut ParsedTable, line: &str) -> bool {
    let Some(mut headers) = tab_separated_headers(line) else {
        return false;
    };
    if headers.len() > table.column_count() {
        return false;
    }
    headers.resize(table.column_count(), String::new());
    table.headers = headers;
    true
}

fn table_for_token<'a>(caps: &Captures<'_>, tables: &'a [ParsedTable]) -> Option<&'a ParsedTable> {
    caps[1].parse::<usize>().ok().and_then(|i| tables.get(i))
}

/// Strip layout noise left by PDF extraction
fn clean_artifacts(text: &str) -> String {
    let text = DATE_RUN.replace_all(text, "");
    let text = UNIT_BRACKET.replace_all(&text, "");
    let text = BARE_INTEGER_LINE.replace_all(&text, "");
    let text = text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n");
    BLANK_RUN.replace_all(&text, "\n\n").trim().to_string()
}

fn render_html(summaries: &[String], text: &str, tables: &[ParsedTable]) -> String {
    let mut html = String::from("<div class=\"rag-source\">");

    if !summaries.is_empty() {
        html.push_str(&format!(
            "<div style=\"{}\"><strong>Samenvatting</strong><ul style=\"margin: 0.25rem 0 0 1rem; padding: 0;\">",
            SUMMARY_BOX_STYLE
        ));
        for summary in summaries {
            html.push_str(&format!("<li>{}</li>", escape_html(summary)));
        }
        html.push_str("</ul></div>");
    }

    let mut last = 0;
    for caps in TABLE_TOKEN.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        push_paragraphs(&mut html, &text[last..whole.start()]);
        match table_for_token(&caps, tables) {
            Some(table) => html.push_str(&table_to_html(table)),
            None => push_paragraphs(&mut html, whole.as_str()),
        }
        last = whole.end();
    }
    push_paragraphs(&mut html, &text[last..]);

    html.push_str("</div>");
    html
}

fn push_paragraphs(html: &mut String, text: &str) {
    for paragraph in text.split("\n\n") {
        let lines: Vec<String> = paragraph
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(escape_html)
            .collect();
        if lines.is_empty() {
            continue;
        }
        html.push_str(&format!(
            "<p style=\"{}\">{}</p>",
            PARAGRAPH_STYLE,
            lines.join("<br />")
        ));
    }
}

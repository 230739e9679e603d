//! Markdown and HTML renderers for parsed tables

use super::table::ParsedTable;

const TABLE_STYLE: &str =
    "border-collapse: collapse; width: 100%; margin: 0.75rem 0; font-size: 0.875rem;";
const TH_STYLE: &str = "border: 1px solid #e5e7eb; padding: 6px 10px; background-color: #f3f4f6; text-align: left; font-weight: 600;";
const TD_STYLE: &str = "border: 1px solid #e5e7eb; padding: 6px 10px; vertical-align: top;";
const ROW_EVEN: &str = "#ffffff";
const ROW_ODD: &str = "#f9fafb";

/// Escape text for HTML bodies and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a table as markdown with every cell padded to its column width
pub fn table_to_markdown(table: &ParsedTable) -> String {
    let columns = table
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(table.headers.len()))
        .max()
        .unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let cell = |row: &[String], i: usize| row.get(i).map(String::as_str).unwrap_or("").to_string();

    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            std::iter::once(&table.headers)
                .chain(table.rows.iter())
                .map(|row| cell(row.as_slice(), i).chars().count())
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let render_row = |row: &[String]| {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| format!("{:<width$}", cell(row, i), width = w))
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = Vec::with_capacity(table.rows.len() + 2);
    lines.push(render_row(table.headers.as_slice()));
    lines.push(format!(
        "| {} |",
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join(" | ")
    ));
    for row in &table.rows {
        lines.push(render_row(row.as_slice()));
    }
    lines.join("\n")
}

/// Render a table as styled HTML with alternating row backgrounds
pub fn table_to_html(table: &ParsedTable) -> String {
    let mut html = format!("<table style=\"{}\">", TABLE_STYLE);

    if !table.is_headerless() {
        html.push_str("<thead><tr>");
        for header in &table.headers {
            html.push_str(&format!(
                "<th style=\"{}\">{}</th>",
                TH_STYLE,
                escape_html(header)
            ));
        }
        html.push_str("</tr></thead>");
    }

    html.push_str("<tbody>");
    for (i, row) in table.rows.iter().enumerate() {
        let background = if i % 2 == 0 { ROW_EVEN } else { ROW_ODD };
        html.push_str(&format!("<tr style=\"background-color: {};\">", background));
        for value in row {
            html.push_str(&format!(
                "<td style=\"{}\">{}</td>",
                TD_STYLE,
                escape_html(value)
            ));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::table::parse_pipe_table;

    fn sample() -> ParsedTable {
        ParsedTable {
            headers: vec!["Functie".into(), "Eis".into()],
            rows: vec![
                vec!["woonfunctie".into(), "2,6 m".into()],
                vec!["bijeenkomst".into(), "< 3 m & \"vrij\"".into()],
            ],
        }
    }

    #[test]
    fn test_markdown_pads_columns() {
        let md = table_to_markdown(&sample());
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines.len(), 4);
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
        assert!(lines[1].starts_with("| ---"));
    }

    #[test]
    fn test_markdown_reparses_to_same_shape() {
        let table = sample();
        let reparsed = parse_pipe_table(&table_to_markdown(&table)).unwrap();
        assert_eq!(reparsed.headers, table.headers);
        assert_eq!(reparsed.rows.len(), table.rows.len());
    }

    #[test]
    fn test_html_escapes_and_alternates() {
        let html = table_to_html(&sample());
        assert!(html.contains("&lt; 3 m &amp; &quot;vrij&quot;"));
        assert!(html.contains("background-color: #f9fafb"));
        assert!(html.contains("<th"));
        assert!(!html.contains("< 3 m"));
    }

    #[test]
    fn test_html_headerless_has_no_thead() {
        let table = ParsedTable {
            headers: vec![String::new(), String::new()],
            rows: vec![vec!["a".into(), "b".into()]],
        };
        assert!(!table_to_html(&table).contains("<thead>"));
    }
}

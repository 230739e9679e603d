//! Pipe-table reconstruction
//!
//! Chunk text arrives with tables in two shapes: regular multi-line pipe
//! tables, and tables flattened onto a single line where the row boundaries
//! were lost. Both are parsed into a [`ParsedTable`] whose rows all have the
//! same width as the headers.

use serde::{Deserialize, Serialize};

/// A table recovered from chunk text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTable {
    /// Column headers; all empty for a headerless table
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedTable {
    /// True when the source supplied no header row
    pub fn is_headerless(&self) -> bool {
        self.headers.iter().all(|h| h.is_empty())
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// A line consisting only of dashes, colons, pipes and whitespace, where
/// every cell is a separator cell
pub(crate) fn is_separator_line(line: &str) -> bool {
    let trimmed = line.trim();
    if !trimmed
        .chars()
        .all(|c| matches!(c, '-' | ':' | '|' | ' ' | '\t'))
    {
        return false;
    }
    let mut cells = trimmed.split('|').map(str::trim).filter(|c| !c.is_empty()).peekable();
    cells.peek().is_some() && cells.all(is_separator_cell)
}

/// `--`, `---`, `:-:` and the like. A lone `-` is a placeholder value, not
/// a separator.
fn is_separator_cell(cell: &str) -> bool {
    let cell = cell.trim();
    cell.len() >= 2 && cell.contains('-') && cell.chars().all(|c| c == '-' || c == ':')
}

/// True when a single line carries a `| --- | --- |` run
pub(crate) fn has_separator_run(line: &str) -> bool {
    line.split('|').any(is_separator_cell)
}

/// Split one row on `|`, dropping the empty cells produced by outer pipes
fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let mut cells: Vec<String> = trimmed.split('|').map(|c| c.trim().to_string()).collect();

    if trimmed.starts_with('|') && cells.first().is_some_and(|c| c.is_empty()) {
        cells.remove(0);
    }
    if trimmed.ends_with('|') && cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}

/// Parse a pipe table from raw text.
///
/// Returns `None` when the text does not hold a usable table; callers keep
/// the original text in that case.
pub fn parse_pipe_table(text: &str) -> Option<ParsedTable> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && l.contains('|'))
        .collect();

    let table = match lines.as_slice() {
        [] => return None,
        [single] => parse_flattened(single)?,
        _ => parse_multiline(&lines)?,
    };

    Some(normalize_columns(table))
}

fn parse_multiline(lines: &[&str]) -> Option<ParsedTable> {
    let headerless = is_separator_line(lines[0]);

    let content: Vec<Vec<String>> = lines
        .iter()
        .filter(|l| !is_separator_line(l))
        .map(|l| split_cells(l))
        .filter(|cells| !cells.is_empty())
        .collect();

    let width = content.iter().map(Vec::len).max().unwrap_or(0);
    if width < 2 {
        return None;
    }

    let (mut headers, mut rows) = if headerless {
        (vec![String::new(); width], content)
    } else {
        let mut iter = content.into_iter();
        let headers = iter.next()?;
        (headers, iter.collect::<Vec<_>>())
    };

    if rows.is_empty() {
        return None;
    }

    headers.resize(width, String::new());
    for row in &mut rows {
        row.resize(width, String::new());
    }

    Some(ParsedTable { headers, rows })
}

/// Rebuild a table whose rows were joined onto one line:
/// `| A | B | | --- | --- | | 1 | 2 | | 3 | 4 |`
fn parse_flattened(line: &str) -> Option<ParsedTable> {
    let raw: Vec<&str> = line.split('|').map(str::trim).collect();

    let sep_start = raw.iter().position(|c| is_separator_cell(c))?;
    let header_count = raw[sep_start..]
        .iter()
        .take_while(|c| is_separator_cell(c))
        .count();

    let mut headers: Vec<String> = raw[..sep_start]
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect();
    if headers.len() > header_count {
        headers = headers.split_off(headers.len() - header_count);
    }
    headers.resize(header_count, String::new());

    // Empty cells here are the remains of row boundaries
    let data: Vec<String> = raw[sep_start + header_count..]
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect();
    if data.is_empty() {
        return None;
    }

    let row_len = detect_row_length(data.len(), header_count);
    let rows = data
        .chunks(row_len)
        .map(|chunk| {
            let mut row = chunk.to_vec();
            row.resize(row_len, String::new());
            row
        })
        .collect();

    Some(ParsedTable { headers, rows })
}

/// Pick a row length for `cell_count` flattened cells.
///
/// Tries divisors from `cell_count / 2` down to the header count and takes
/// the first one giving at least two rows. Data rows may be wider than the
/// header when upstream flattening duplicated or split fields.
pub(crate) fn detect_row_length(cell_count: usize, header_count: usize) -> usize {
    let header_count = header_count.max(1);
    if cell_count <= header_count {
        return header_count;
    }

    let mut candidate = cell_count / 2;
    while candidate >= header_count {
        if cell_count % candidate == 0 && cell_count / candidate >= 2 {
            return candidate;
        }
        candidate -= 1;
    }
    header_count
}

/// Bring every row to the header width.
///
/// Fully empty columns are dropped. When rows are still wider than the
/// named headers, the excess leftmost cells are merged into the first column
/// and the last column is kept as-is.
pub fn normalize_columns(table: ParsedTable) -> ParsedTable {
    let ParsedTable { mut headers, mut rows } = table;

    let width = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);
    headers.resize(width, String::new());
    for row in &mut rows {
        row.resize(width, String::new());
    }

    let keep: Vec<usize> = (0..width)
        .filter(|&i| !headers[i].is_empty() || rows.iter().any(|r| !r[i].is_empty()))
        .collect();
    if keep.is_empty() {
        return ParsedTable { headers, rows };
    }

    let mut headers: Vec<String> = keep.iter().map(|&i| headers[i].clone()).collect();
    let mut rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return ParsedTable { headers, rows };
    }

    let target = headers
        .iter()
        .rposition(|h| !h.is_empty())
        .map_or(0, |p| p + 1);
    if target == 0 || target >= headers.len() {
        return ParsedTable { headers, rows };
    }

    headers.truncate(target);
    for row in &mut rows {
        let excess = row.len() - target;
        let merged = row[..=excess]
            .iter()
            .filter(|c| !c.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        let mut rebuilt = Vec::with_capacity(target);
        rebuilt.push(merged);
        rebuilt.extend(row[excess + 1..].iter().cloned());
        *row = rebuilt;
    }

    ParsedTable { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_flattened_table_recovery() {
        let table = parse_pipe_table("| A | B | | --- | --- | | 1 | 2 | | 3 | 4 |").unwrap();
        assert_eq!(table.headers, strings(&["A", "B"]));
        assert_eq!(table.rows, vec![strings(&["1", "2"]), strings(&["3", "4"])]);
    }

    #[test]
    fn test_multiline_table() {
        let text = "| Functie | Hoogte |\n| --- | --- |\n| woonfunctie | 2,6 m |\n| kantoorfunctie | 2,6 m |";
        let table = parse_pipe_table(text).unwrap();
        assert_eq!(table.headers, strings(&["Functie", "Hoogte"]));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], strings(&["woonfunctie", "2,6 m"]));
    }

    #[test]
    fn test_headerless_when_separator_first() {
        let text = "| --- | --- |\n| a | b |\n| c | d |";
        let table = parse_pipe_table(text).unwrap();
        assert!(table.is_headerless());
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let text = "| A | B | C |\n| --- | --- | --- |\n| 1 | 2 |\n| 4 | 5 | 6 |";
        let table = parse_pipe_table(text).unwrap();
        assert_eq!(table.rows[0], strings(&["1", "2", ""]));
        for row in &table.rows {
            assert_eq!(row.len(), table.headers.len());
        }
    }

    #[test]
    fn test_wide_rows_merge_leftmost_cells() {
        let table = normalize_columns(ParsedTable {
            headers: strings(&["Omschrijving", "Waarde"]),
            rows: vec![strings(&["vrije", "hoogte", "2,6"])],
        });
        assert_eq!(table.headers, strings(&["Omschrijving", "Waarde"]));
        assert_eq!(table.rows[0], strings(&["vrije hoogte", "2,6"]));
    }

    #[test]
    fn test_empty_columns_dropped() {
        let table = normalize_columns(ParsedTable {
            headers: strings(&["A", "", "B"]),
            rows: vec![strings(&["1", "", "2"]), strings(&["3", "", "4"])],
        });
        assert_eq!(table.headers, strings(&["A", "B"]));
        assert_eq!(table.rows[1], strings(&["3", "4"]));
    }

    #[test]
    fn test_flattened_wider_data_rows() {
        // three data cells per row under two headers
        let line = "| Artikel | Eis | | --- | --- | | 4.163 | lid 1 | 2,6 m | | 4.164 | lid 2 | 2,1 m |";
        let table = parse_pipe_table(line).unwrap();
        assert_eq!(table.headers, strings(&["Artikel", "Eis"]));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], strings(&["4.163 lid 1", "2,6 m"]));
        assert_eq!(table.rows[1], strings(&["4.164 lid 2", "2,1 m"]));
    }

    #[test]
    fn test_detect_row_length() {
        assert_eq!(detect_row_length(4, 2), 2);
        assert_eq!(detect_row_length(6, 3), 3);
        assert_eq!(detect_row_length(2, 2), 2);
        // no divisor in range falls back to the header count
        assert_eq!(detect_row_length(7, 2), 2);
    }

    #[test]
    fn test_not_a_table() {
        assert!(parse_pipe_table("geen tabel hier").is_none());
        assert!(parse_pipe_table("| alleen | kop |").is_none());
        assert!(parse_pipe_table("| A | B |\n| --- | --- |").is_none());
    }

    #[test]
    fn test_separator_detection() {
        assert!(is_separator_line("| --- | :---: |"));
        assert!(is_separator_line("| -- | -- |"));
        assert!(is_separator_line("|:-:|:-:|"));
        assert!(!is_separator_line("| - | - |"));
        assert!(!is_separator_line("| :: | :: |"));
        assert!(!is_separator_line("| --- | 2,6 |"));
        assert!(has_separator_run("| A | | --- | x"));
        assert!(has_separator_run("| A | |:-:| x"));
    }

    #[test]
    fn test_short_separators() {
        let table = parse_pipe_table("| Functie | Hoogte |\n|:-:|:-:|\n| woonfunctie | 2,6 m |").unwrap();
        assert_eq!(table.headers, strings(&["Functie", "Hoogte"]));
        assert_eq!(table.rows, vec![strings(&["woonfunctie", "2,6 m"])]);

        let table = parse_pipe_table("| A | B | | -- | -- | | 1 | 2 | | 3 | 4 |").unwrap();
        assert_eq!(table.headers, strings(&["A", "B"]));
        assert_eq!(table.rows, vec![strings(&["1", "2"]), strings(&["3", "4"])]);
    }

    #[test]
    fn test_dash_placeholder_row_is_data() {
        let text = "| Functie | Hoogte |\n| --- | --- |\n| - | - |\n| woonfunctie | 2,6 m |";
        let table = parse_pipe_table(text).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], strings(&["-", "-"]));
    }
}

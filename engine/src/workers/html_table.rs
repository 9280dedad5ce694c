//! HTML table extraction
//!
//! Lightweight, regex-driven reader for `<table>` markup. Handles the shapes
//! found on typical reference pages: a `<th>` header row, `colspan` and
//! `rowspan`, omitted `</td>`/`</th>`/`</tr>` end tags, inline markup inside
//! cells, character entities. Nested tables are not supported.

use regex::Regex;
use sdk::{CellValue, Dataset};
use std::sync::OnceLock;

/// Upper bound on `colspan` expansion
const MAX_COLSPAN: usize = 64;

struct Patterns {
    noise: Regex,
    table: Regex,
    structure: Regex,
    colspan: Regex,
    rowspan: Regex,
    line_break: Regex,
    tag: Regex,
    entity: Regex,
    whitespace: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        noise: Regex::new(r"(?is)<!--.*?-->|<(script|style)\b[^>]*>.*?</(?:script|style)\s*>")
            .expect("Invalid noise pattern"),
        table: Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>").expect("Invalid table pattern"),
        structure: Regex::new(r"(?is)<(/?)(tr|td|th|thead|tbody|tfoot)\b([^>]*)>")
            .expect("Invalid structure pattern"),
        colspan: Regex::new(r#"(?i)colspan\s*=\s*["']?(\d+)"#).expect("Invalid colspan pattern"),
        rowspan: Regex::new(r#"(?i)rowspan\s*=\s*["']?(\d+)"#).expect("Invalid rowspan pattern"),
        line_break: Regex::new(r"(?i)<br\s*/?>").expect("Invalid br pattern"),
        tag: Regex::new(r"(?s)<[^>]*>").expect("Invalid tag pattern"),
        entity: Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);")
            .expect("Invalid entity pattern"),
        whitespace: Regex::new(r"\s+").expect("Invalid whitespace pattern"),
    })
}

/// A cell as written in the markup, before spans are laid out
struct RawCell {
    text: String,
    is_header: bool,
    colspan: usize,
    rowspan: usize,
}

struct OpenCell {
    is_header: bool,
    colspan: usize,
    rowspan: usize,
    start: usize,
}

struct RawRow {
    cells: Vec<String>,
    all_header: bool,
}

/// Every table in the document, in document order
pub fn extract_tables(html: &str) -> Vec<Dataset> {
    let p = patterns();
    let cleaned = p.noise.replace_all(html, "");

    p.table
        .captures_iter(&cleaned)
        .filter_map(|caps| caps.get(1).and_then(|body| parse_table(body.as_str())))
        .collect()
}

/// The table with the most cells; the first one wins ties
pub fn largest_table(html: &str) -> Option<Dataset> {
    extract_tables(html)
        .into_iter()
        .rev()
        .max_by_key(Dataset::cell_count)
}

fn span(pattern: &Regex, attrs: &str) -> usize {
    pattern
        .captures(attrs)
        .and_then(|c| c[1].parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

/// Split a table body into rows of cells.
///
/// A cell ends at the next structural tag, so omitted end tags are fine.
fn scan_rows(body: &str) -> Vec<Vec<RawCell>> {
    let p = patterns();
    let mut rows: Vec<Vec<RawCell>> = Vec::new();
    let mut row: Option<Vec<RawCell>> = None;
    let mut open: Option<OpenCell> = None;

    fn close_cell(
        body: &str,
        end: usize,
        open: &mut Option<OpenCell>,
        row: &mut Option<Vec<RawCell>>,
    ) {
        if let Some(cell) = open.take() {
            row.get_or_insert_with(Vec::new).push(RawCell {
                text: cell_text(&body[cell.start..end]),
                is_header: cell.is_header,
                colspan: cell.colspan,
                rowspan: cell.rowspan,
            });
        }
    }

    for caps in p.structure.captures_iter(body) {
        let Some(whole) = caps.get(0) else { continue };
        close_cell(body, whole.start(), &mut open, &mut row);

        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        match (closing, name.as_str()) {
            (false, "td") | (false, "th") => {
                if row.is_none() {
                    row = Some(Vec::new());
                }
                open = Some(OpenCell {
                    is_header: name == "th",
                    colspan: span(&p.colspan, &caps[3]).min(MAX_COLSPAN),
                    rowspan: span(&p.rowspan, &caps[3]),
                    start: whole.end(),
                });
            }
            (true, "td") | (true, "th") => {}
            // <tr>, </tr> and section boundaries all end the current row
            _ => rows.extend(row.take()),
        }
    }
    close_cell(body, body.len(), &mut open, &mut row);
    rows.extend(row.take());

    rows.retain(|cells| !cells.is_empty());
    rows
}

/// Append carried cells for as long as the next column is still spanned
fn take_carried(cells: &mut Vec<String>, carry: &mut [Option<(usize, String)>]) {
    while let Some(Some((remaining, text))) = carry.get_mut(cells.len()) {
        cells.push(text.clone());
        *remaining -= 1;
        if *remaining == 0 {
            carry[cells.len() - 1] = None;
        }
    }
}

/// Lay cells out on the grid, copying `rowspan` cells down into later rows
fn layout_rows(raw_rows: Vec<Vec<RawCell>>) -> Vec<RawRow> {
    // Per column: rows still covered, and the text to repeat there
    let mut carry: Vec<Option<(usize, String)>> = Vec::new();
    let mut rows = Vec::with_capacity(raw_rows.len());

    for raw in raw_rows {
        let all_header = raw.iter().all(|c| c.is_header);
        let mut cells: Vec<String> = Vec::new();

        for cell in raw {
            take_carried(&mut cells, &mut carry);
            for _ in 0..cell.colspan {
                let col = cells.len();
                if cell.rowspan > 1 {
                    if carry.len() <= col {
                        carry.resize(col + 1, None);
                    }
                    carry[col] = Some((cell.rowspan - 1, cell.text.clone()));
                }
                cells.push(cell.text.clone());
            }
        }

        // Spans reaching past this row's own cells
        while carry[cells.len().min(carry.len())..].iter().any(Option::is_some) {
            if carry[cells.len()].is_some() {
                take_carried(&mut cells, &mut carry);
            } else {
                cells.push(String::new());
            }
        }

        rows.push(RawRow { cells, all_header });
    }

    rows
}

fn parse_table(body: &str) -> Option<Dataset> {
    let rows = layout_rows(scan_rows(body));

    let (header, data) = match rows.split_first() {
        Some((first, rest)) if first.all_header => (Some(&first.cells), rest),
        Some(_) => (None, rows.as_slice()),
        None => return None,
    };

    let width = data
        .iter()
        .map(|r| r.cells.len())
        .chain(header.map(Vec::len))
        .max()
        .unwrap_or(0);
    if width == 0 {
        return None;
    }

    let mut columns: Vec<String> = header.cloned().unwrap_or_default();
    columns.resize(width, String::new());

    let mut dataset = Dataset::new(columns);
    for raw in data {
        let mut row: Vec<CellValue> = raw.cells.iter().map(|c| CellValue::infer(c)).collect();
        row.resize(width, CellValue::Null);
        // Width is fixed above, so this cannot fail
        dataset.push_row(row).ok()?;
    }

    Some(dataset)
}

/// Visible text of a cell's inner HTML
fn cell_text(inner: &str) -> String {
    let p = patterns();
    let with_breaks = p.line_break.replace_all(inner, " ");
    let without_tags = p.tag.replace_all(&with_breaks, "");
    let decoded = decode_entities(&without_tags);
    p.whitespace.replace_all(decoded.trim(), " ").into_owned()
}

fn decode_entities(text: &str) -> String {
    patterns()
        .entity
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "ndash" => Some('\u{2013}'),
                    "mdash" => Some('\u{2014}'),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

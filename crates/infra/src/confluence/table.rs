//! Domain table inside a page's storage markup
//!
//! The table is located by its `ac:local-id` attribute. Reading flattens
//! each cell to text; writing renders a typed [`DomainRow`] and inserts it as
//! the last row of the table body. Existing markup is never rewritten.

use cmdbsync_domain::{
    clean_domain_display, DomainEntry, DomainMapping, DomainRow, EntrySource, Result, SyncError,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

#[allow(clippy::unwrap_used)]
static TABLE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<table\b[^>]*?\bac:local-id="([^"]*)"[^>]*>"#).unwrap());

#[allow(clippy::unwrap_used)]
static TABLE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</table\s*>").unwrap());

#[allow(clippy::unwrap_used)]
static TBODY_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</tbody\s*>").unwrap());

#[allow(clippy::unwrap_used)]
static ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").unwrap());

#[allow(clippy::unwrap_used)]
static CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<t([dh])\b[^>]*>(.*?)</t[dh]\s*>").unwrap());

#[allow(clippy::unwrap_used)]
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

#[allow(clippy::unwrap_used)]
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap());

/// Byte range of the located table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TableSpan {
    /// Start of `<table ...>`.
    start: usize,
    /// Start of `</table>`.
    close: usize,
}

fn locate(storage: &str, table_id: &str) -> Result<TableSpan> {
    let open = TABLE_OPEN
        .captures_iter(storage)
        .find(|caps| caps.get(1).is_some_and(|id| id.as_str() == table_id))
        .and_then(|caps| caps.get(0))
        .ok_or_else(|| SyncError::NotFound(format!("table {table_id} not found on the page")))?;

    let close = TABLE_CLOSE
        .find_at(storage, open.end())
        .ok_or_else(|| SyncError::Data(format!("table {table_id} is not closed")))?;

    Ok(TableSpan { start: open.start(), close: close.start() })
}

/// Decode the named and numeric entities found in storage markup.
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Visible text of a cell, tags removed and entities decoded.
fn cell_text(inner: &str) -> String {
    decode_entities(&TAG.replace_all(inner, "")).trim().to_string()
}

/// Cell texts of every row of the table, header row included.
fn rows(storage: &str, span: TableSpan) -> Vec<Vec<String>> {
    let table = &storage[span.start..span.close];
    ROW.captures_iter(table)
        .map(|row| {
            CELL.captures_iter(&row[1])
                .map(|cell| cell_text(cell.get(2).map_or("", |m| m.as_str())))
                .collect()
        })
        .collect()
}

/// Parse the domain mapping out of the page storage.
///
/// The first row is a header. A data row needs an identifier in column 0 and
/// a display name in column 1; any other row is skipped.
pub fn parse_domain_table(storage: &str, table_id: &str) -> Result<DomainMapping> {
    let span = locate(storage, table_id)?;
    let rows = rows(storage, span);

    let mut mapping = DomainMapping::new();
    let mut skipped = 0usize;
    for cells in rows.iter().skip(1) {
        let (Some(sys_id), Some(raw_name)) = (cells.first(), cells.get(1)) else {
            skipped += 1;
            continue;
        };
        let (name, qualifier) = clean_domain_display(raw_name);
        if sys_id.is_empty() || name.is_empty() {
            skipped += 1;
            continue;
        }
        mapping.insert_document(DomainEntry {
            sys_id: sys_id.clone(),
            name,
            qualifier,
            source: EntrySource::Document,
        });
    }
    debug!(table_id, rows = rows.len(), domains = mapping.len(), skipped, "domain table parsed");
    Ok(mapping)
}

/// Markup of one table row.
pub fn render_row(row: &DomainRow) -> String {
    let cells: String = row
        .cells
        .iter()
        .map(|cell| format!("<td><p>{}</p></td>", escape_text(&cell.display_text())))
        .collect();
    format!("<tr>{cells}</tr>")
}

/// Storage markup with `row` appended as the last row of the table body.
pub fn insert_row(storage: &str, table_id: &str, row: &DomainRow) -> Result<String> {
    let span = locate(storage, table_id)?;
    let table = &storage[span.start..span.close];
    let insert_at = TBODY_CLOSE
        .find_iter(table)
        .last()
        .map_or(span.close, |m| span.start + m.start());

    let rendered = render_row(row);
    let mut updated = String::with_capacity(storage.len() + rendered.len());
    updated.push_str(&storage[..insert_at]);
    updated.push_str(&rendered);
    updated.push_str(&storage[insert_at..]);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use cmdbsync_domain::DomainQualifier;

    use super::*;

    const PAGE: &str = r#"<p>Intro</p>
<table data-layout="default" ac:local-id="other"><tbody><tr><td>x</td><td>y</td></tr></tbody></table>
<table data-layout="wide" ac:local-id="tbl-1"><colgroup><col /></colgroup><tbody>
<tr><th><p><strong>sys_id</strong></p></th><th><p>Business Domain</p></th><th><p>Schedule</p></th></tr>
<tr><td><p>D1</p></td><td><p>&quot;Finance&quot;</p></td><td><p>Monthly</p></td></tr>
<tr><td><p>D2</p></td><td><p>"Data &amp; AI" (planned)</p></td><td><p>Monthly</p></td></tr>
<tr><td><p>D3</p></td><td><p>"HR \/ People" (Retired)</p></td><td /></tr>
<tr><td><p></p></td><td><p>"Orphan"</p></td></tr>
<tr><td><p>D5</p></td></tr>
</tbody></table>
<p>Outro</p>"#;

    #[test]
    fn parses_rows_of_the_selected_table() {
        let mapping = parse_domain_table(PAGE, "tbl-1").unwrap();
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.get("D1").map(|e| e.name.as_str()), Some("Finance"));

        let planned = mapping.get("D2").unwrap();
        assert_eq!(planned.name, "Data & AI");
        assert_eq!(planned.qualifier, Some(DomainQualifier::Planned));

        let retired = mapping.get("D3").unwrap();
        assert_eq!(retired.name, "HR / People");
        assert_eq!(retired.qualifier, Some(DomainQualifier::Retired));
        assert!(!mapping.contains("x"));
    }

    #[test]
    fn unknown_table_is_not_found() {
        assert!(matches!(parse_domain_table(PAGE, "missing"), Err(SyncError::NotFound(_))));
    }

    #[test]
    fn numeric_entities_decode() {
        assert_eq!(decode_entities("Caf&#233; &#x26; Bar &unknown;"), "Café & Bar &unknown;");
    }

    #[test]
    fn inserted_row_is_last_in_body_and_reads_back() {
        let row = DomainRow::for_domain("D9", "R&D <Labs>", Some(DomainQualifier::Planned));
        let updated = insert_row(PAGE, "tbl-1", &row).unwrap();

        let rendered = render_row(&row);
        assert!(rendered.contains("R&amp;D &lt;Labs&gt;"));
        assert!(updated.contains(&format!("{rendered}</tbody></table>\n<p>Outro</p>")));
        assert!(updated.starts_with("<p>Intro</p>"));

        let mapping = parse_domain_table(&updated, "tbl-1").unwrap();
        let entry = mapping.get("D9").unwrap();
        assert_eq!(entry.name, "R&D <Labs>");
        assert_eq!(entry.qualifier, Some(DomainQualifier::Planned));
        // the other table is untouched
        assert_eq!(parse_domain_table(&updated, "other").unwrap().len(), 0);
    }

    #[test]
    fn table_without_body_gets_the_row_before_its_end() {
        let page = r#"<table ac:local-id="t"><tr><th>id</th><th>name</th></tr></table>"#;
        let row = DomainRow::for_domain("D1", "Ops", None);
        let updated = insert_row(page, "t", &row).unwrap();
        assert!(updated.ends_with(&format!("{}</table>", render_row(&row))));
        assert_eq!(parse_domain_table(&updated, "t").unwrap().len(), 1);
    }
}

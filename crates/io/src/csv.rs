// Catalog CSV/TSV import and feed CSV export

use stockfeed_recon::{Table, Value};

use crate::error::IngestError;

/// Separators a catalog may use, in tie-break order.
const CANDIDATES: &[u8] = &[b'\t', b';', b','];

/// Non-blank lines sampled when guessing the separator.
const SNIFF_LINES: usize = 10;

/// A parsed catalog plus the delimiter that produced it.
#[derive(Debug, Clone)]
pub struct CatalogTable {
    pub table: Table,
    pub delimiter: u8,
}

/// Parse catalog bytes.
///
/// Tries the sniffed delimiter, then comma, then semicolon. The first clean
/// parse whose header has `join_column` wins; when none has it, the first clean
/// parse is returned and the engine reports the missing column. Fails only when
/// no delimiter parses, listing why each attempt was rejected.
pub fn read_catalog(bytes: &[u8], join_column: &str) -> Result<CatalogTable, IngestError> {
    let content = decode_text(bytes);
    if content.trim().is_empty() {
        return Err(IngestError::Catalog { attempts: vec!["catalog is empty".into()] });
    }

    let mut tried: Vec<u8> = Vec::new();
    let mut attempts = Vec::new();
    let mut first_clean: Option<CatalogTable> = None;

    for delimiter in [sniff_delimiter(&content), b',', b';'] {
        if tried.contains(&delimiter) {
            continue;
        }
        tried.push(delimiter);

        match import_from_string(&content, delimiter) {
            Ok(table) if table.has_column(join_column) => {
                log::debug!(
                    "catalog parsed with delimiter {:?}: {} rows",
                    delimiter as char,
                    table.len()
                );
                return Ok(CatalogTable { table, delimiter });
            }
            Ok(table) => {
                if first_clean.is_none() {
                    first_clean = Some(CatalogTable { table, delimiter });
                }
            }
            Err(e) => attempts.push(format!("delimiter {:?}: {e}", delimiter as char)),
        }
    }

    match first_clean {
        Some(catalog) => {
            log::debug!(
                "no delimiter yields a '{join_column}' column; keeping the {:?} parse",
                catalog.delimiter as char
            );
            Ok(catalog)
        }
        None => Err(IngestError::Catalog { attempts }),
    }
}

/// Guess the catalog separator from the first few non-blank lines.
///
/// A candidate must split the header into at least two fields. Its score is
/// the header width times the number of sampled lines with that same width;
/// the earlier candidate keeps a tie. Comma when nothing qualifies.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    let Some(header) = sample.first() else {
        return b',';
    };

    let mut best: Option<(u8, usize)> = None;
    for &delimiter in CANDIDATES {
        let width = field_count(header, delimiter);
        if width < 2 {
            continue;
        }
        let agreeing = sample.iter().filter(|line| field_count(line, delimiter) == width).count();
        let score = width * agreeing;
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((delimiter, score));
        }
    }
    best.map_or(b',', |(delimiter, _)| delimiter)
}

/// Fields in one line under `delimiter`, honoring quotes.
fn field_count(line: &str, delimiter: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |record| record.len())
}

/// Decode to UTF-8, dropping a BOM. Falls back to Windows-1252 (common for
/// Excel-exported CSVs) when the bytes are not valid UTF-8.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Strict parse: the header defines the width and every record must match it.
fn import_from_string(content: &str, delimiter: u8) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut table = Table::new(headers);
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        table.push_row(record.iter().map(Value::text).collect());
    }
    Ok(table)
}

// ============================================================================
// Export
// ============================================================================

/// Encode the feed as delimited text with a header row.
pub fn export_feed(table: &Table, delimiter: u8) -> Result<Vec<u8>, String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(table.headers()).map_err(|e| e.to_string())?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(|e| e.to_string())?;
    }

    writer.into_inner().map_err(|e| e.to_string())
}

// Stock export import (xlsx, xls, xlsb, ods) and feed export (xlsx only)
//
// Import reads cell values only: no formulas, number formats or styles. The
// first non-blank row of the first sheet is the header.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use stockfeed_recon::config::IngestConfig;
use stockfeed_recon::{Table, Value};

use crate::error::IngestError;
use crate::repair::{needs_repair, repair_styles};

/// Result of a successful stock import
#[derive(Debug, Clone)]
pub struct Ingested {
    pub table: Table,
    /// Name of the sheet the rows came from
    pub sheet: String,
    /// Whether the styles repair was needed to read the file
    pub recovered: bool,
    /// Token substitutions made by the repair (0 when not recovered)
    pub repairs_applied: usize,
}

/// Why a single read attempt failed.
enum ReadFailure {
    /// The container or sheet XML could not be parsed. Worth a repair attempt.
    Parse(String),
    /// The workbook parsed but lacks something we need. Repair won't help.
    Structural(IngestError),
}

/// Import a stock export.
///
/// When the styles part carries one of the configured corrupt tokens, it is
/// repaired before the first read. Otherwise the workbook is read directly and
/// repaired only if that read fails. A workbook that parses but has no data
/// rows is `IngestError::NoDataRows`.
pub fn ingest_stock(bytes: &[u8], config: &IngestConfig) -> Result<Ingested, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptySource);
    }

    if needs_repair(bytes, &config.repairs) {
        log::info!("styles part carries a known corrupt token; repairing before read");
        return match read_repaired(bytes, config) {
            Ok((sheet, table, replacements)) => finish(sheet, table, true, replacements),
            Err(ReadFailure::Structural(e)) => Err(e),
            Err(ReadFailure::Parse(repair)) => {
                log::warn!("repaired read failed ({repair}); trying the file as is");
                match read_first_sheet(bytes) {
                    Ok((sheet, table)) => finish(sheet, table, false, 0),
                    Err(ReadFailure::Structural(e)) => Err(e),
                    Err(ReadFailure::Parse(direct)) => Err(IngestError::Unreadable { direct, repair }),
                }
            }
        };
    }

    let direct = match read_first_sheet(bytes) {
        Ok((sheet, table)) => return finish(sheet, table, false, 0),
        Err(ReadFailure::Structural(e)) => return Err(e),
        Err(ReadFailure::Parse(msg)) => msg,
    };

    log::warn!("direct read failed ({direct}); retrying after styles repair");
    match read_repaired(bytes, config) {
        Ok((sheet, table, replacements)) => finish(sheet, table, true, replacements),
        Err(ReadFailure::Structural(e)) => Err(e),
        Err(ReadFailure::Parse(repair)) => Err(IngestError::Unreadable { direct, repair }),
    }
}

fn read_repaired(bytes: &[u8], config: &IngestConfig) -> Result<(String, Table, usize), ReadFailure> {
    let repaired = repair_styles(bytes, &config.repairs).map_err(ReadFailure::Parse)?;
    let (sheet, table) = read_first_sheet(&repaired.bytes)?;
    log::info!(
        "stock export recovered after {} styles repair(s) in {}",
        repaired.replacements,
        repaired.styles_part
    );
    Ok((sheet, table, repaired.replacements))
}

fn finish(sheet: String, table: Table, recovered: bool, repairs_applied: usize) -> Result<Ingested, IngestError> {
    if table.is_empty() {
        return Err(IngestError::NoDataRows);
    }
    log::debug!(
        "ingested sheet '{}': {} columns, {} rows",
        sheet,
        table.headers().len(),
        table.len()
    );
    Ok(Ingested { table, sheet, recovered, repairs_applied })
}

fn read_first_sheet(bytes: &[u8]) -> Result<(String, Table), ReadFailure> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ReadFailure::Parse(format!("failed to open workbook: {e}")))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ReadFailure::Structural(IngestError::NoSheets))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ReadFailure::Parse(format!("failed to read sheet '{sheet}': {e}")))?;

    let table = range_to_table(&range).ok_or(ReadFailure::Structural(IngestError::NoHeader))?;
    Ok((sheet, table))
}

/// First non-blank row becomes the header (verbatim), the remaining non-blank
/// rows become data in sheet order. None when the sheet is blank.
fn range_to_table(range: &Range<Data>) -> Option<Table> {
    let mut rows = range.rows().filter(|row| row.iter().any(|c| !is_blank(c)));

    let header_row = rows.next()?;
    let headers = header_row.iter().map(|c| cell_value(c).to_string()).collect();
    let mut table = Table::new(headers);

    for row in rows {
        table.push_row(row.iter().map(cell_value).collect());
    }
    Some(table)
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::text(s.as_str()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Integer(*n),
        // Store as TRUE/FALSE text, same as the spreadsheet shows it
        Data::Bool(b) => Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Value::Text(format!("#{:?}", e)),
        // Serial date number; the feed never interprets dates
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) => Value::text(s.as_str()),
        Data::DurationIso(s) => Value::text(s.as_str()),
    }
}

// ============================================================================
// Export: feed table -> xlsx
// ============================================================================

/// Maximum data rows in one worksheet (Excel limit minus the header row)
const MAX_XLSX_ROWS: usize = 1_048_575;

/// Write the feed as a single-sheet workbook with a bold header row.
pub fn export_feed(table: &Table, sheet_name: &str) -> Result<Vec<u8>, String> {
    if table.len() > MAX_XLSX_ROWS {
        return Err(format!("feed has {} rows, xlsx allows at most {}", table.len(), MAX_XLSX_ROWS));
    }

    let mut workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(sheet_name)
        .map_err(|e| format!("invalid sheet name '{sheet_name}': {e}"))?;

    for (col, header) in table.headers().iter().enumerate() {
        let col = u16::try_from(col).map_err(|_| "too many columns for xlsx".to_string())?;
        worksheet
            .write_string_with_format(0, col, header.as_str(), &header_format)
            .map_err(|e| e.to_string())?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let r = (row_idx + 1) as u32;
        for (col_idx, value) in row.iter().enumerate() {
            let c = u16::try_from(col_idx).map_err(|_| "too many columns for xlsx".to_string())?;
            match value {
                Value::Empty => {}
                Value::Text(s) => {
                    worksheet.write_string(r, c, s.as_str()).map_err(|e| e.to_string())?;
                }
                Value::Integer(n) => {
                    worksheet.write_number(r, c, *n as f64).map_err(|e| e.to_string())?;
                }
                Value::Number(n) => {
                    worksheet.write_number(r, c, *n).map_err(|e| e.to_string())?;
                }
            }
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| format!("failed to write xlsx: {e}"))
}

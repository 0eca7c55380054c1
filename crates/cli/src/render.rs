//! Human-readable delta table.

use stockfeed_recon::model::{DeltaReport, DeltaRow};
use stockfeed_recon::ReconSummary;

const HEADERS: [&str; 5] = ["name", "previous_quantity", "new_quantity", "delta", "loss_value"];

pub const DECREASE_MARKER: &str = "▼";
pub const INCREASE_MARKER: &str = "▲";

/// Render the report as an aligned text table followed by a totals line.
/// An empty report renders as a single "no quantity changes" line.
pub fn render_delta(report: &DeltaReport) -> String {
    if report.is_unchanged() {
        return format!("no quantity changes ({} rows compared)\n", report.summary.compared);
    }

    let cells: Vec<[String; 5]> = report.rows.iter().map(row_cells).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, "  ", &HEADERS.map(String::from), &widths);
    for (row, cells) in report.rows.iter().zip(&cells) {
        let marker = if row.is_decrease() { DECREASE_MARKER } else { INCREASE_MARKER };
        push_line(&mut out, &format!("{marker} "), cells, &widths);
    }

    let s = &report.summary;
    out.push_str(&format!(
        "\n{} changed ({} {DECREASE_MARKER}, {} {INCREASE_MARKER}) of {} compared, total loss {:.2}\n",
        s.changed, s.decreases, s.increases, s.compared, s.total_loss
    ));
    out
}

fn row_cells(row: &DeltaRow) -> [String; 5] {
    [
        row.name.clone(),
        row.previous_quantity.to_string(),
        row.new_quantity.to_string(),
        format!("{:+}", row.delta),
        format!("{:.2}", row.loss_value),
    ]
}

fn push_line(out: &mut String, prefix: &str, cells: &[String; 5], widths: &[usize; 5]) {
    out.push_str(prefix);
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        let pad = width.saturating_sub(cell.chars().count());
        if i > 0 {
            out.push_str("  ");
            // Numeric columns right-aligned
            out.push_str(&" ".repeat(pad));
            out.push_str(cell);
        } else {
            out.push_str(cell);
            out.push_str(&" ".repeat(pad));
        }
    }
    out.truncate(out.trim_end().len());
    out.push('\n');
}

/// One-line reconciliation summary for stderr.
pub fn render_summary(summary: &ReconSummary) -> String {
    let mut line = format!(
        "{} of {} stock rows kept, {} dropped ({} catalog identifiers)",
        summary.matched_rows, summary.stock_rows, summary.dropped_rows, summary.catalog_keys
    );
    if summary.coerced_defaults > 0 {
        line.push_str(&format!(", {} unparsable value(s) written as 0", summary.coerced_defaults));
    }
    line
}

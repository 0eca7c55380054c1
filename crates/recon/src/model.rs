use serde::Serialize;

use crate::table::Table;

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

/// Filtered, renamed stock feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconResult {
    pub table: Table,
    pub summary: ReconSummary,
    /// Output column holding the join identifier.
    pub identifier_column: String,
    /// Output column holding the coerced quantity, if the schema has one.
    pub quantity_column: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub stock_rows: usize,
    /// Distinct identifiers in the catalog.
    pub catalog_keys: usize,
    pub matched_rows: usize,
    pub dropped_rows: usize,
    /// Numeric cells that could not be parsed and were written as 0.
    pub coerced_defaults: usize,
}

// ---------------------------------------------------------------------------
// Delta report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaRow {
    pub key: String,
    pub name: String,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub delta: i64,
    pub loss_value: f64,
}

impl DeltaRow {
    pub fn is_decrease(&self) -> bool {
        self.delta < 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeltaSummary {
    /// Feed rows compared against the catalog.
    pub compared: usize,
    pub changed: usize,
    pub increases: usize,
    pub decreases: usize,
    pub total_loss: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeltaReport {
    pub rows: Vec<DeltaRow>,
    pub summary: DeltaSummary,
}

impl DeltaReport {
    /// True when no quantity changed. Not an error.
    pub fn is_unchanged(&self) -> bool {
        self.rows.is_empty()
    }
}

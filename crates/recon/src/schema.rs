//! Resolve the declarative column list against concrete table headers.
//!
//! All required columns are checked in one pass so a bad input produces a
//! single error naming everything that is missing, in config order.

use crate::config::{ColumnSpec, ReconConfig};
use crate::error::ReconError;
use crate::table::Table;

#[derive(Debug)]
pub struct ResolvedColumn<'a> {
    pub spec: &'a ColumnSpec,
    /// Index of `spec.source` in the stock table.
    pub index: usize,
}

#[derive(Debug)]
pub struct StockSchema<'a> {
    pub key_index: usize,
    pub columns: Vec<ResolvedColumn<'a>>,
}

/// Look up every stock column the config needs.
pub fn resolve_stock<'a>(config: &'a ReconConfig, stock: &Table) -> Result<StockSchema<'a>, ReconError> {
    let mut required: Vec<&str> = vec![config.join.stock_column.as_str()];
    required.extend(config.columns.iter().map(|c| c.source.as_str()));
    check_columns(stock, "stock", &required)?;

    // Every lookup below succeeds after check_columns
    let index_of = |name: &str| stock.column_index(name).unwrap_or_default();

    Ok(StockSchema {
        key_index: index_of(&config.join.stock_column),
        columns: config
            .columns
            .iter()
            .map(|spec| ResolvedColumn { spec, index: index_of(&spec.source) })
            .collect(),
    })
}

/// Return the index of each column, or one `Schema` error naming all absent
/// columns (deduplicated, first-seen order).
pub fn require_columns(table: &Table, table_name: &str, columns: &[&str]) -> Result<Vec<usize>, ReconError> {
    check_columns(table, table_name, columns)?;
    Ok(columns.iter().map(|c| table.column_index(c).unwrap_or_default()).collect())
}

fn check_columns(table: &Table, table_name: &str, columns: &[&str]) -> Result<(), ReconError> {
    let mut missing: Vec<String> = Vec::new();
    for &name in columns {
        if !table.has_column(name) && !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReconError::schema(table_name, missing))
    }
}

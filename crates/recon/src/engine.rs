use std::collections::HashSet;

use crate::coerce;
use crate::config::{Coercion, ReconConfig};
use crate::error::ReconError;
use crate::model::{ReconResult, ReconSummary};
use crate::schema::{require_columns, resolve_stock};
use crate::table::{Table, Value};

/// Filter the stock table down to identifiers present in the catalog, then
/// rename and coerce per config.
///
/// This is a membership filter, not a relational join: a stock row appears at
/// most once in the result no matter how often its identifier repeats in the
/// catalog. Result rows keep stock-table order. Any missing column aborts the
/// whole run before a single row is produced.
pub fn reconcile(stock: &Table, catalog: &Table, config: &ReconConfig) -> Result<ReconResult, ReconError> {
    config.validate()?;

    let schema = resolve_stock(config, stock)?;
    let catalog_key_idx = require_columns(catalog, "catalog", &[config.join.catalog_column.as_str()])?[0];

    let catalog_keys: HashSet<String> = catalog
        .rows()
        .iter()
        .map(|row| row[catalog_key_idx].as_key())
        .filter(|k| !k.is_empty())
        .collect();

    let headers = config.columns.iter().map(|c| c.target.clone()).collect();
    let mut table = Table::new(headers);
    let mut coerced_defaults = 0usize;

    for row in stock.rows() {
        let key = row[schema.key_index].as_key();
        if key.is_empty() || !catalog_keys.contains(&key) {
            continue;
        }

        let mut out = Vec::with_capacity(schema.columns.len());
        for col in &schema.columns {
            let raw = &row[col.index];
            let value = match col.spec.coerce {
                Coercion::Text if col.index == schema.key_index => Value::Text(key.clone()),
                Coercion::Text => raw.clone(),
                Coercion::Quantity => Value::Integer(coerce::quantity(raw).unwrap_or_else(|| {
                    coerced_defaults += 1;
                    0
                })),
                Coercion::Decimal => Value::Number(coerce::decimal(raw).unwrap_or_else(|| {
                    coerced_defaults += 1;
                    0.0
                })),
            };
            out.push(value);
        }
        table.push_row(out);
    }

    let summary = ReconSummary {
        stock_rows: stock.len(),
        catalog_keys: catalog_keys.len(),
        matched_rows: table.len(),
        dropped_rows: stock.len() - table.len(),
        coerced_defaults,
    };

    log::debug!(
        "reconcile: {} of {} stock rows matched {} catalog keys ({} coerced to 0)",
        summary.matched_rows,
        summary.stock_rows,
        summary.catalog_keys,
        summary.coerced_defaults
    );

    Ok(ReconResult {
        table,
        summary,
        identifier_column: config
            .identifier_column()
            .map(|c| c.target.clone())
            .unwrap_or_else(|| config.join.stock_column.clone()),
        quantity_column: config.quantity_column().map(|c| c.target.clone()),
    })
}

use std::collections::HashMap;

use crate::coerce;
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::model::{DeltaReport, DeltaRow, DeltaSummary, ReconResult};
use crate::schema::require_columns;
use crate::table::{Table, Value};

/// Compare the feed's quantities against the quantities last published in
/// `catalog`.
///
/// Left join from the feed: a feed row without a catalog entry compares
/// against quantity 0, price 0 and the placeholder name. When the catalog
/// lists an identifier more than once, the first occurrence is used. Only
/// changed rows are kept, in feed order. An empty report is a normal outcome.
pub fn diff(result: &ReconResult, catalog: &Table, config: &ReconConfig) -> Result<DeltaReport, ReconError> {
    let quantity_column = result.quantity_column.as_deref().ok_or_else(|| {
        ReconError::ConfigValidation("delta report requires an output column with coerce = \"quantity\"".into())
    })?;

    let feed_idx = require_columns(
        &result.table,
        "feed",
        &[result.identifier_column.as_str(), quantity_column],
    )?;
    let (feed_key_idx, feed_qty_idx) = (feed_idx[0], feed_idx[1]);

    let cols = &config.catalog;
    let catalog_idx = require_columns(
        catalog,
        "catalog",
        &[config.join.catalog_column.as_str(), cols.quantity_column.as_str()],
    )?;
    let (cat_key_idx, cat_qty_idx) = (catalog_idx[0], catalog_idx[1]);
    // Optional: rows fall back to placeholder name / zero price
    let cat_name_idx = catalog.column_index(&cols.name_column);
    let cat_price_idx = catalog.column_index(&cols.price_column);

    let mut index: HashMap<String, &[Value]> = HashMap::new();
    for row in catalog.rows() {
        let key = row[cat_key_idx].as_key();
        if !key.is_empty() {
            index.entry(key).or_insert(row.as_slice());
        }
    }

    let mut rows = Vec::new();
    let mut summary = DeltaSummary::default();

    for feed_row in result.table.rows() {
        summary.compared += 1;

        let key = feed_row[feed_key_idx].as_key();
        let new_quantity = coerce::quantity(&feed_row[feed_qty_idx]).unwrap_or(0);

        let entry = index.get(&key);
        let previous_quantity = entry.and_then(|r| coerce::quantity(&r[cat_qty_idx])).unwrap_or(0);
        let name = entry
            .zip(cat_name_idx)
            .map(|(r, i)| r[i].to_string())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| cols.placeholder_name.clone());
        let price = entry
            .zip(cat_price_idx)
            .and_then(|(r, i)| coerce::decimal(&r[i]))
            .unwrap_or(0.0);

        let delta = new_quantity - previous_quantity;
        if delta == 0 {
            continue;
        }

        let loss_value = if delta < 0 { -(delta as f64) * price } else { 0.0 };

        if delta < 0 {
            summary.decreases += 1;
        } else {
            summary.increases += 1;
        }
        summary.total_loss += loss_value;

        rows.push(DeltaRow {
            key,
            name,
            previous_quantity,
            new_quantity,
            delta,
            loss_value,
        });
    }

    summary.changed = rows.len();
    log::debug!(
        "diff: {} of {} feed rows changed, estimated loss {:.2}",
        summary.changed,
        summary.compared,
        summary.total_loss
    );

    Ok(DeltaReport { rows, summary })
}

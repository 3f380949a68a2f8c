//! Table Extractor
//!
//! Column aggregates over a `TableResult`. A metric whose column cannot be
//! resolved is `None`; that is distinct from a resolved column whose cells
//! are all blank.

use crate::columns::{resolve_column, resolve_column_except};
use crate::numeric::{normalize_conversion_rate, parse_numeric};
use crate::table::{ColumnDef, Row, TableResult};
use std::borrow::Cow;

/// Column definitions to resolve against. When the API omits `columns` but
/// sends keyed rows, the keys of the first keyed row stand in for them.
fn effective_columns(table: &TableResult) -> Cow<'_, [ColumnDef]> {
    if !table.columns.is_empty() {
        return Cow::Borrowed(&table.columns);
    }
    let derived: Vec<ColumnDef> = table
        .rows
        .iter()
        .find_map(|row| match row {
            Row::Keyed(map) => Some(map.keys().map(|k| ColumnDef::new(k.as_str())).collect()),
            Row::Positional(_) => None,
        })
        .unwrap_or_default();
    Cow::Owned(derived)
}

/// Sum a column across all rows.
///
/// Unparseable cells are skipped. A resolved column over zero rows sums to `0`.
pub fn sum_column(table: &TableResult, candidates: &[&str]) -> Option<i64> {
    let columns = effective_columns(table);
    let index = resolve_column(&columns, candidates)?;
    let name = columns[index].name.as_str();

    let total: f64 = table
        .rows
        .iter()
        .filter_map(|row| row.cell(index, name))
        .filter_map(parse_numeric)
        .sum();

    Some(total.round() as i64)
}

/// Average a conversion-rate column, weighted by a session column when one
/// resolves.
///
/// Each row's value goes through `normalize_conversion_rate`; rows without a
/// usable value are skipped entirely. Rows with a positive weight feed the
/// weighted average; if no row carried a usable weight the plain mean of the
/// usable values is returned instead. No usable values at all yields `None`.
pub fn weighted_average_column(
    table: &TableResult,
    candidates: &[&str],
    weight_candidates: &[&str],
) -> Option<f64> {
    let columns = effective_columns(table);
    let index = resolve_column(&columns, candidates)?;
    let name = columns[index].name.as_str();
    let weight = resolve_column_except(&columns, weight_candidates, index)
        .map(|w| (w, columns[w].name.as_str()));

    let mut simple_sum = 0.0;
    let mut simple_count = 0usize;
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for row in &table.rows {
        let Some(value) = row.cell(index, name).and_then(normalize_conversion_rate) else {
            continue;
        };
        simple_sum += value;
        simple_count += 1;

        if let Some((w_index, w_name)) = weight {
            if let Some(w) = row.cell(w_index, w_name).and_then(parse_numeric) {
                if w > 0.0 {
                    weighted_sum += value * w;
                    weight_total += w;
                }
            }
        }
    }

    if weight_total > 0.0 {
        Some(weighted_sum / weight_total)
    } else if simple_count > 0 {
        Some(simple_sum / simple_count as f64)
    } else {
        None
    }
}

//! Column Resolver
//!
//! Maps a logical metric name ("sessions", "conversion_rate") onto a physical
//! column of a returned table. The API has shipped the same metric as
//! "Sessions", "total_sessions" and "online-store conversion rate" over time,
//! so matching is done on a normalized form and accepts substrings.

use crate::table::{ColumnDef, Row};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref SEPARATOR_RUN: Regex = Regex::new(r"[\s\-]+").unwrap();
}

/// Comparison key for a column label. The original label is left untouched
/// on the `ColumnDef` for display.
pub fn normalize_column_name(name: &str) -> String {
    SEPARATOR_RUN
        .replace_all(name.trim().to_lowercase().as_str(), "_")
        .into_owned()
}

/// Find the column for the first matching candidate.
///
/// Candidates are tried in order (most specific first); within a candidate the
/// earliest column whose normalized name equals or contains the normalized
/// candidate wins.
pub fn resolve_column(columns: &[ColumnDef], candidates: &[&str]) -> Option<usize> {
    resolve_column_skipping(columns, candidates, None)
}

/// `resolve_column` that never returns the `skip` position, so a second
/// metric can be resolved next to one already claimed.
pub fn resolve_column_except(columns: &[ColumnDef], candidates: &[&str], skip: usize) -> Option<usize> {
    resolve_column_skipping(columns, candidates, Some(skip))
}

fn resolve_column_skipping(columns: &[ColumnDef], candidates: &[&str], skip: Option<usize>) -> Option<usize> {
    let normalized_columns: Vec<String> = columns
        .iter()
        .map(|c| normalize_column_name(&c.name))
        .collect();

    for candidate in candidates {
        let wanted = normalize_column_name(candidate);
        if wanted.is_empty() {
            continue;
        }
        if let Some(index) = normalized_columns
            .iter()
            .enumerate()
            .position(|(i, name)| {
                Some(i) != skip && (name == &wanted || name.contains(wanted.as_str()))
            })
        {
            return Some(index);
        }
    }
    None
}

/// Read one cell regardless of row representation.
///
/// Positional rows are indexed by `index`. Keyed rows try `column_name`
/// verbatim, then any key whose normalized form matches.
pub fn get_cell<'a>(row: &'a Row, index: usize, column_name: &str) -> Option<&'a Value> {
    match row {
        Row::Positional(cells) => cells.get(index),
        Row::Keyed(map) => map.get(column_name).or_else(|| {
            let wanted = normalize_column_name(column_name);
            map.iter()
                .find(|(key, _)| normalize_column_name(key) == wanted)
                .map(|(_, value)| value)
        }),
    }
}

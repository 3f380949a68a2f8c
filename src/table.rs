//! Tabular payload returned by the analytics query API.

use crate::columns::get_cell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result table of one query: column definitions plus rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableResult {
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Free-text label, compared case- and separator-insensitively
    pub name: String,
    #[serde(rename = "dataType", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            display_name: None,
        }
    }
}

/// One result row. Depending on endpoint version the API sends either
/// positional arrays aligned with `columns` or objects keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Row {
    Positional(Vec<Value>),
    Keyed(Map<String, Value>),
}

impl Row {
    /// Cell at `index` for positional rows, or under `column_name` for keyed ones.
    pub fn cell(&self, index: usize, column_name: &str) -> Option<&Value> {
        get_cell(self, index, column_name)
    }
}

impl TableResult {
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Build a table from bare column names.
    pub fn with_columns(names: &[&str], rows: Vec<Row>) -> Self {
        Self::new(names.iter().map(|n| ColumnDef::new(*n)).collect(), rows)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

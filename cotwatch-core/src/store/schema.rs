//! Typed row schema shared by all source tables.
//!
//! Every source persists rows keyed by a calendar date plus a fixed set of
//! typed business columns. The schema is data, not a compile-time type: many
//! sources share one shape (a flavor) and the updater only ever moves rows
//! around, so a small closed set of column types is enough.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Column value types a source table can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Float,
    Int,
    Text,
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Text(String),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Float(_) => ColumnType::Float,
            Value::Int(_) => ColumnType::Int,
            Value::Text(_) => ColumnType::Text,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Text(_) => None,
        }
    }
}

/// Fixed business columns of a source table (the Date key is implicit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<(String, ColumnType)>,
}

impl Schema {
    pub fn new(columns: &[(&str, ColumnType)]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|(name, ty)| (name.to_string(), *ty))
                .collect(),
        }
    }

    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Position of a named column, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    /// Column names, in declaration order. These double as the atom names a
    /// source donates to the formula layer.
    pub fn atoms(&self) -> Vec<String> {
        self.columns.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Check a row against this schema (width and per-column type).
    pub fn validate(&self, row: &Row) -> Result<(), String> {
        if row.values.len() != self.columns.len() {
            return Err(format!(
                "row has {} values, schema has {} columns",
                row.values.len(),
                self.columns.len()
            ));
        }
        for (value, (name, ty)) in row.values.iter().zip(&self.columns) {
            if value.column_type() != *ty {
                return Err(format!(
                    "column '{name}' expects {ty:?}, got {:?}",
                    value.column_type()
                ));
            }
        }
        Ok(())
    }
}

/// One stored observation: a date key plus the schema's column values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub date: NaiveDate,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(date: NaiveDate, values: Vec<Value>) -> Self {
        Self { date, values }
    }
}

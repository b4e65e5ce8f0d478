//! Destination-side values and derived tables.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::cell::{Cell, format_numeric};
use crate::error::{ModelError, Result};

/// A value bound into a destination statement. `Null` is the store's null.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Bool(bool),
}

impl Value {
    /// Carry a source cell across unchanged in type. Absent cells become `Null`.
    pub fn from_cell(cell: Option<&Cell>) -> Self {
        match cell {
            None => Self::Null,
            Some(Cell::Text(value)) if value.trim().is_empty() => Self::Null,
            Some(Cell::Text(value)) => Self::Text(value.clone()),
            Some(Cell::Int(value)) => Self::Int(*value),
            Some(Cell::Float(value)) => Self::Float(*value),
            Some(Cell::Date(value)) => Self::Date(*value),
            Some(Cell::DateTime(value)) => Self::DateTime(*value),
            Some(Cell::Bool(value)) => Self::Bool(*value),
        }
    }

    /// Render a source cell into a text column. Absent cells become `Null`.
    pub fn text_from_cell(cell: Option<&Cell>) -> Self {
        match Self::from_cell(cell) {
            Self::Null => Self::Null,
            Self::Text(value) => Self::Text(value),
            other => Self::Text(other.to_string()),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn opt_date(value: Option<NaiveDate>) -> Self {
        value.map_or(Self::Null, Self::Date)
    }

    pub fn opt_datetime(value: Option<NaiveDateTime>) -> Self {
        value.map_or(Self::Null, Self::DateTime)
    }

    pub fn opt_text(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => f.write_str(&format_numeric(*value)),
            Self::Text(value) => f.write_str(value),
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Self::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            Self::Bool(value) => write!(f, "{}", i32::from(*value)),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A derived destination table: named columns and positional rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl DestinationTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row carrying one value per column.
    pub fn push(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ModelError::RowWidth {
                table: self.name.clone(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// Value at `row` for the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|values| values.get(idx))
    }

    /// All values of one column, top to bottom.
    pub fn column_values(&self, column: &str) -> Vec<&Value> {
        match self.column_index(column) {
            Some(idx) => self.rows.iter().map(|row| &row[idx]).collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_become_null_not_empty() {
        assert_eq!(Value::from_cell(None), Value::Null);
        assert_eq!(Value::from_cell(Some(&Cell::Text(" ".into()))), Value::Null);
        assert_eq!(Value::from_cell(Some(&Cell::Int(0))), Value::Int(0));
        assert_eq!(Value::text_from_cell(None), Value::Null);
    }

    #[test]
    fn text_rendering_keeps_integers_clean() {
        assert_eq!(
            Value::text_from_cell(Some(&Cell::Float(265_888_123.0))),
            Value::Text("265888123".to_string())
        );
        assert_eq!(
            Value::text_from_cell(Some(&Cell::Int(7))),
            Value::Text("7".to_string())
        );
    }

    #[test]
    fn table_lookup_by_column() {
        let mut table = DestinationTable::new("person", vec!["person_id".into(), "gender".into()]);
        table.push(vec![Value::Int(11), Value::text("F")]).unwrap();
        table.push(vec![Value::Int(12), Value::Null]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(1, "person_id"), Some(&Value::Int(12)));
        assert_eq!(table.column_values("gender"), vec![&Value::text("F"), &Value::Null]);
    }

    #[test]
    fn rows_of_the_wrong_width_are_refused() {
        let mut table = DestinationTable::new("person", vec!["person_id".into(), "gender".into()]);
        let err = table.push(vec![Value::Int(11)]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::RowWidth { expected: 2, found: 1, .. }
        ));
        assert!(table.is_empty());
        assert!(table.column_values("gender").is_empty());
    }
}

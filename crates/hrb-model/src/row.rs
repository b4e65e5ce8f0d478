//! Source rows and the record set produced by an extraction.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::error::{ModelError, Result};

/// One source record: ordered column/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<(String, Option<Cell>)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly used by tests and adapters.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: Option<Cell>) -> Self {
        self.set(column, value);
        self
    }

    /// Present, non-blank value of a column. Missing columns and nulls are both `None`.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_ref())
            .filter(|cell| !cell.is_blank())
    }

    /// Returns true when the column exists in this row, null or not.
    pub fn has_column(&self, column: &str) -> bool {
        self.cells.iter().any(|(name, _)| name == column)
    }

    /// Replace a column value, appending the column when it is new.
    pub fn set(&mut self, column: impl Into<String>, value: Option<Cell>) {
        let column = column.into();
        if let Some(slot) = self.cells.iter_mut().find(|(name, _)| *name == column) {
            slot.1 = value;
        } else {
            self.cells.push((column, value));
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Cell>)> {
        self.cells
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Read-only table of rows with stable column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecordSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl SourceRecordSet {
    /// Build a record set from a column list and rows.
    ///
    /// Every row is padded so that it carries every declared column; columns
    /// a row does not mention become nulls.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                for column in &columns {
                    if !row.has_column(column) {
                        row.set(column.clone(), None);
                    }
                }
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build a record set whose column list is the union of row columns, in first-seen order.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for column in row.columns() {
                if !columns.iter().any(|existing| existing == column) {
                    columns.push(column.to_string());
                }
            }
        }
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }

    /// Fails with the first required column the extraction did not produce.
    pub fn require_columns<S: AsRef<str>>(&self, required: &[S]) -> Result<()> {
        for column in required {
            let column = column.as_ref();
            if !self.has_column(column) {
                return Err(ModelError::MissingColumn {
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SourceRecordSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_hides_nulls_and_blanks() {
        let row = Row::new()
            .with("a", Some(Cell::Int(1)))
            .with("b", None)
            .with("c", Some(Cell::Text("   ".into())));
        assert_eq!(row.get("a"), Some(&Cell::Int(1)));
        assert_eq!(row.get("b"), None);
        assert_eq!(row.get("c"), None);
        assert_eq!(row.get("missing"), None);
        assert!(row.has_column("b"));
        assert!(!row.has_column("missing"));
    }

    #[test]
    fn set_replaces_in_place() {
        let mut row = Row::new().with("a", Some(Cell::Int(1))).with("b", None);
        row.set("a", Some(Cell::Int(2)));
        row.set("z", Some(Cell::Int(3)));
        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, vec!["a", "b", "z"]);
        assert_eq!(row.get("a"), Some(&Cell::Int(2)));
    }

    #[test]
    fn record_set_pads_rows_and_checks_columns() {
        let set = SourceRecordSet::from_rows(vec![
            Row::new().with("x", Some(Cell::Int(1))),
            Row::new().with("y", Some(Cell::Int(2))),
        ]);
        assert_eq!(set.columns(), ["x".to_string(), "y".to_string()]);
        assert!(set.rows()[0].has_column("y"));
        assert!(set.require_columns(&["x", "y"]).is_ok());
        assert!(matches!(
            set.require_columns(&["z"]),
            Err(ModelError::MissingColumn { .. })
        ));
    }
}

//! The store a loader writes into.

use crate::error::StoreError;
use crate::identifier::Identifier;
use crate::statement::InsertStatement;

/// One column as declared by the destination schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub nullable: bool,
    /// The store fills the column when an insert omits it.
    pub has_default: bool,
}

impl ColumnDef {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: false,
            has_default: false,
        }
    }

    pub fn nullable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: true,
            has_default: false,
        }
    }
}

/// Known shape of a destination table, used as the column allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    /// Column sets whose combined values must be unique.
    pub unique_keys: Vec<Vec<String>>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
            unique_keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_unique_key(mut self, columns: &[&str]) -> Self {
        self.unique_keys
            .push(columns.iter().map(ToString::to_string).collect());
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// A relational store that accepts whole-table batches.
///
/// Callers must serialize runs against one store: reading a watermark and
/// inserting the rows that use it is only safe inside one critical section.
pub trait Destination {
    /// Largest existing value of an integer key column, or 0 for an empty table.
    fn watermark(&mut self, table: &Identifier, column: &Identifier) -> Result<i64, StoreError>;

    /// The table's declared columns, when the store can describe them.
    fn table_schema(&mut self, table: &Identifier) -> Result<Option<TableSchema>, StoreError>;

    /// Insert every row of the statement in one unit of work.
    ///
    /// Implementations must commit all rows or none of them.
    fn insert_batch(&mut self, statement: &InsertStatement) -> Result<u64, StoreError>;
}

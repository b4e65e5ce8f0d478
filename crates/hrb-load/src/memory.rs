//! In-memory destination for dry runs and tests.

use std::collections::BTreeMap;

use tracing::debug;

use hrb_model::Value;

use crate::destination::{Destination, TableSchema};
use crate::error::StoreError;
use crate::identifier::Identifier;
use crate::statement::InsertStatement;

type StoredRow = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    schema: Option<TableSchema>,
    rows: Vec<StoredRow>,
}

/// A destination held in memory.
///
/// Declared tables enforce NOT NULL and unique keys. Batches are checked in
/// full before any row is stored, so a failing batch leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    tables: BTreeMap<String, MemoryTable>,
    /// Accept inserts into undeclared tables without checks.
    permissive: bool,
}

impl MemoryDestination {
    /// A destination that only accepts declared tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// A destination that accepts any table, for dry runs.
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_table(mut self, schema: TableSchema) -> Self {
        self.tables.insert(
            schema.name.clone(),
            MemoryTable {
                schema: Some(schema),
                rows: Vec::new(),
            },
        );
        self
    }

    /// Store a pre-existing row without checks, e.g. to raise a watermark.
    pub fn seed(&mut self, table: &str, row: Vec<(&str, Value)>) {
        let stored = row
            .into_iter()
            .map(|(column, value)| (column.to_string(), value))
            .collect();
        self.tables
            .entry(table.to_string())
            .or_default()
            .rows
            .push(stored);
    }

    pub fn rows(&self, table: &str) -> &[StoredRow] {
        self.tables
            .get(table)
            .map_or(&[][..], |stored| stored.rows.as_slice())
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    /// Table names that hold at least one row.
    pub fn populated_tables(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .filter(|(_, stored)| !stored.rows.is_empty())
            .map(|(name, _)| name.as_str())
    }
}

fn check_row(schema: &TableSchema, row: &StoredRow) -> Result<(), StoreError> {
    for column in &schema.columns {
        if column.nullable {
            continue;
        }
        match row.get(&column.name) {
            Some(value) if value.is_null() => {
                return Err(StoreError::Constraint {
                    table: schema.name.clone(),
                    message: format!("column '{}' cannot be null", column.name),
                });
            }
            None if !column.has_default => {
                return Err(StoreError::Constraint {
                    table: schema.name.clone(),
                    message: format!("column '{}' has no default value", column.name),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn unique_key<'a>(key: &[String], row: &'a StoredRow) -> Option<Vec<&'a Value>> {
    // NULLs never collide, as in SQL
    key.iter()
        .map(|column| row.get(column).filter(|value| !value.is_null()))
        .collect()
}

fn check_unique(
    schema: &TableSchema,
    existing: &[StoredRow],
    staged: &[StoredRow],
    row: &StoredRow,
) -> Result<(), StoreError> {
    for key in &schema.unique_keys {
        let Some(candidate) = unique_key(key, row) else {
            continue;
        };
        let duplicate = existing
            .iter()
            .chain(staged)
            .any(|other| unique_key(key, other).as_ref() == Some(&candidate));
        if duplicate {
            return Err(StoreError::Constraint {
                table: schema.name.clone(),
                message: format!("duplicate entry for key ({})", key.join(", ")),
            });
        }
    }
    Ok(())
}

impl Destination for MemoryDestination {
    fn watermark(&mut self, table: &Identifier, column: &Identifier) -> Result<i64, StoreError> {
        Ok(self
            .rows(table.as_str())
            .iter()
            .filter_map(|row| row.get(column.as_str()).and_then(Value::as_int))
            .max()
            .unwrap_or(0))
    }

    fn table_schema(&mut self, table: &Identifier) -> Result<Option<TableSchema>, StoreError> {
        Ok(self
            .tables
            .get(table.as_str())
            .and_then(|stored| stored.schema.clone()))
    }

    fn insert_batch(&mut self, statement: &InsertStatement) -> Result<u64, StoreError> {
        let name = statement.table().as_str();
        if !self.permissive
            && self
                .tables
                .get(name)
                .is_none_or(|stored| stored.schema.is_none())
        {
            return Err(StoreError::UnknownTable(name.to_string()));
        }

        let target = self.tables.entry(name.to_string()).or_default();
        let mut staged: Vec<StoredRow> = Vec::with_capacity(statement.len());
        for values in statement.rows() {
            let row: StoredRow = statement
                .columns()
                .iter()
                .map(ToString::to_string)
                .zip(values.iter().cloned())
                .collect();
            if let Some(schema) = &target.schema {
                check_row(schema, &row)?;
                check_unique(schema, &target.rows, &staged, &row)?;
            }
            staged.push(row);
        }

        let written = staged.len() as u64;
        target.rows.extend(staged);
        debug!(table = name, rows = written, "committed in-memory batch");
        Ok(written)
    }
}

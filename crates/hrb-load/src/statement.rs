//! Parameterized insert statements built from destination tables.

use hrb_model::{DestinationTable, Value};

use crate::destination::TableSchema;
use crate::error::{LoadError, Result};
use crate::identifier::Identifier;

/// A validated multi-row insert. Values are only ever bound, never spliced.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    table: Identifier,
    columns: Vec<Identifier>,
    rows: Vec<Vec<Value>>,
}

impl InsertStatement {
    /// Validate every identifier of `table`. Nothing touches a store here.
    pub fn new(table: &DestinationTable) -> Result<Self> {
        let name = Identifier::parse(table.name())?;
        let columns = table
            .columns()
            .iter()
            .map(|column| Identifier::parse(column))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            table: name,
            columns,
            rows: table.rows().to_vec(),
        })
    }

    /// Fails on the first column the destination does not declare.
    pub fn check_columns(&self, schema: &TableSchema) -> Result<()> {
        for column in &self.columns {
            if !schema.has_column(column.as_str()) {
                return Err(LoadError::UnknownColumn {
                    table: self.table.to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn table(&self) -> &Identifier {
        &self.table
    }

    pub fn columns(&self) -> &[Identifier] {
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

    /// `INSERT INTO `table` (`a`, `b`) ` with a trailing space, ready for a
    /// `VALUES` list.
    pub fn head(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(Identifier::quoted)
            .collect::<Vec<_>>()
            .join(", ");
        format!("INSERT INTO {} ({columns}) ", self.table.quoted())
    }

    /// Rows per statement such that no chunk binds more than `max_parameters`
    /// values. Always at least one row.
    pub fn rows_per_chunk(&self, max_parameters: usize) -> usize {
        (max_parameters / self.columns.len().max(1)).max(1)
    }

    /// Row slices for one multi-row insert each, in table order.
    pub fn chunks(&self, max_parameters: usize) -> std::slice::Chunks<'_, Vec<Value>> {
        self.rows.chunks(self.rows_per_chunk(max_parameters))
    }

    /// Multi-row statement text for `rows` tuples of `?` placeholders.
    pub fn sql_for(&self, rows: usize) -> String {
        let tuple = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let values = vec![tuple.as_str(); rows].join(", ");
        format!("{}VALUES {values}", self.head())
    }

    /// Statement text covering every row at once.
    pub fn sql(&self) -> String {
        self.sql_for(self.rows.len())
    }
}

//! Dependent destination tables derived from migrated source records.
//!
//! A [`Projection`] emits one row per record. A [`Melt`] turns a group of
//! source columns into one row per record and column, tagging each with the
//! destination type id of the column it came from.

use serde::Deserialize;
use tracing::{debug, warn};

use hrb_model::{DestinationId, DestinationTable, Diagnostic, DimensionTable, Issue, Value};

use crate::allocator::{IdentityMap, new_token};
use crate::error::Result;
use crate::records::SourceRecord;

/// Rendering of a national patient id from an allocated person id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NpidFormat {
    pub prefix: String,
    /// Zero-padded width of the numeric part.
    pub width: usize,
}

impl Default for NpidFormat {
    fn default() -> Self {
        Self {
            prefix: "P1107".to_string(),
            width: 7,
        }
    }
}

impl NpidFormat {
    pub fn render(&self, id: DestinationId) -> String {
        format!("{}{:0width$}", self.prefix, id.get(), width = self.width)
    }
}

/// Where one output column gets its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSource {
    /// A named field of the source record, type preserved.
    Field(String),
    Constant(Value),
    /// The record's allocated destination id.
    DestinationId,
    /// A fresh random token per output row.
    Token,
    Npid(NpidFormat),
}

impl ColumnSource {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    fn evaluate<R: SourceRecord>(&self, record: &R, id: DestinationId) -> Value {
        match self {
            Self::Field(name) => Value::from_cell(record.field(name).as_ref()),
            Self::Constant(value) => value.clone(),
            Self::DestinationId => Value::Int(id.get()),
            Self::Token => Value::Text(new_token().to_string()),
            Self::Npid(format) => Value::Text(format.render(id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct OutputColumn {
    name: String,
    source: ColumnSource,
}

fn column_names(columns: &[OutputColumn]) -> Vec<String> {
    columns.iter().map(|column| column.name.clone()).collect()
}

/// One row per source record.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    table: String,
    columns: Vec<OutputColumn>,
}

impl Projection {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, name: impl Into<String>, source: ColumnSource) -> Self {
        self.columns.push(OutputColumn {
            name: name.into(),
            source,
        });
        self
    }

    /// Build the table. A record without an allocated id aborts the build.
    pub fn build<R: SourceRecord>(&self, records: &[R], ids: &IdentityMap) -> Result<DestinationTable> {
        let mut table = DestinationTable::new(&self.table, column_names(&self.columns));
        for record in records {
            let id = ids.lookup(record.source_key())?;
            table.push(
                self.columns
                    .iter()
                    .map(|column| column.source.evaluate(record, id))
                    .collect(),
            )?;
        }
        debug!(table = %self.table, rows = table.len(), "built projection");
        Ok(table)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MeltVariable {
    code: String,
    source: ColumnSource,
}

/// A built table plus the columns or rows left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub table: DestinationTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Wide-to-long reshape of a column group into typed attribute rows.
///
/// Output columns are the id columns, then the type and value columns,
/// then the token column if one was requested. Rows come out record-major
/// in variable order. Null values produce no row.
#[derive(Debug, Clone, PartialEq)]
pub struct Melt {
    table: String,
    id_columns: Vec<OutputColumn>,
    variables: Vec<MeltVariable>,
    type_column: String,
    value_column: String,
    token_column: Option<String>,
}

impl Melt {
    pub fn new(
        table: impl Into<String>,
        type_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            id_columns: Vec::new(),
            variables: Vec::new(),
            type_column: type_column.into(),
            value_column: value_column.into(),
            token_column: None,
        }
    }

    #[must_use]
    pub fn id(mut self, name: impl Into<String>, source: ColumnSource) -> Self {
        self.id_columns.push(OutputColumn {
            name: name.into(),
            source,
        });
        self
    }

    /// Melt the source field of the same name.
    #[must_use]
    pub fn variable(self, code: impl Into<String>) -> Self {
        let code = code.into();
        let source = ColumnSource::Field(code.clone());
        self.computed_variable(code, source)
    }

    /// Melt a value that is not a plain source field, typed by `code`.
    #[must_use]
    pub fn computed_variable(mut self, code: impl Into<String>, source: ColumnSource) -> Self {
        self.variables.push(MeltVariable {
            code: code.into(),
            source,
        });
        self
    }

    #[must_use]
    pub fn token(mut self, column: impl Into<String>) -> Self {
        self.token_column = Some(column.into());
        self
    }

    fn columns(&self) -> Vec<String> {
        let mut columns = column_names(&self.id_columns);
        columns.push(self.type_column.clone());
        columns.push(self.value_column.clone());
        columns.extend(self.token_column.iter().cloned());
        columns
    }

    /// Build the long table.
    ///
    /// A variable with no entry in `types` is dropped for every record and
    /// reported once. A record without an allocated id aborts the build.
    pub fn build<R: SourceRecord>(
        &self,
        records: &[R],
        ids: &IdentityMap,
        types: &DimensionTable<i64>,
    ) -> Result<BuildOutput> {
        let mut diagnostics = Vec::new();
        let mut mapped: Vec<(&MeltVariable, i64)> = Vec::with_capacity(self.variables.len());
        for variable in &self.variables {
            match types.get(&variable.code) {
                Some(type_id) => mapped.push((variable, *type_id)),
                None => {
                    warn!(table = %self.table, column = %variable.code, "column has no type mapping");
                    diagnostics.push(Diagnostic::column(Issue::UnmappedAttribute {
                        table: self.table.clone(),
                        column: variable.code.clone(),
                    }));
                }
            }
        }

        let mut table = DestinationTable::new(&self.table, self.columns());
        for record in records {
            let id = ids.lookup(record.source_key())?;
            for (variable, type_id) in &mapped {
                let value = as_text(variable.source.evaluate(record, id));
                if value.is_null() {
                    continue;
                }
                let mut row: Vec<Value> = self
                    .id_columns
                    .iter()
                    .map(|column| column.source.evaluate(record, id))
                    .collect();
                row.push(Value::Int(*type_id));
                row.push(value);
                if self.token_column.is_some() {
                    row.push(Value::Text(new_token().to_string()));
                }
                table.push(row)?;
            }
        }
        debug!(
            table = %self.table,
            records = records.len(),
            rows = table.len(),
            "built melt"
        );
        Ok(BuildOutput { table, diagnostics })
    }
}

/// Values of a melted column share one text column.
fn as_text(value: Value) -> Value {
    match value {
        Value::Null | Value::Text(_) => value,
        other => Value::Text(other.to_string()),
    }
}

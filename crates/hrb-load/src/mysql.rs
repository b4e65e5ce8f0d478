//! MySQL destination and source over sqlx.
//!
//! Both adapters own a current-thread tokio runtime and drive every call
//! to completion with `block_on`, so callers stay synchronous.

use sqlx::mysql::{MySql, MySqlConnection, MySqlRow};
use sqlx::query_builder::Separated;
use sqlx::types::chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{Column, Connection, QueryBuilder, Row as _, TypeInfo};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use hrb_model::{Cell, Row, SourceRecordSet, Value};

use crate::destination::{ColumnDef, Destination, TableSchema};
use crate::error::StoreError;
use crate::identifier::Identifier;
use crate::statement::InsertStatement;

fn runtime() -> Result<Runtime, StoreError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(StoreError::Runtime)
}

/// Placeholder limit of a MySQL prepared statement.
const MAX_BIND_PARAMETERS: usize = 65_535;

fn push_value<'args>(tuple: &mut Separated<'_, 'args, MySql, &'static str>, value: &'args Value) {
    match value {
        Value::Null => tuple.push_bind(None::<String>),
        Value::Int(v) => tuple.push_bind(*v),
        Value::Float(v) => tuple.push_bind(*v),
        Value::Text(v) => tuple.push_bind(v.as_str()),
        Value::Date(v) => tuple.push_bind(*v),
        Value::DateTime(v) => tuple.push_bind(*v),
        Value::Bool(v) => tuple.push_bind(*v),
    };
}

/// A live MySQL destination on a single connection.
pub struct MySqlDestination {
    runtime: Runtime,
    conn: MySqlConnection,
}

impl MySqlDestination {
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let runtime = runtime()?;
        let conn = runtime.block_on(MySqlConnection::connect(url))?;
        info!("connected to destination database");
        Ok(Self { runtime, conn })
    }

    /// Take a named advisory lock, waiting up to `timeout_secs`.
    ///
    /// Returns false when the lock is held elsewhere past the timeout.
    pub fn acquire_lock(&mut self, name: &str, timeout_secs: u32) -> Result<bool, StoreError> {
        let conn = &mut self.conn;
        let acquired: Option<i64> = self.runtime.block_on(
            sqlx::query_scalar::<MySql, Option<i64>>("SELECT GET_LOCK(?, ?)")
                .bind(name)
                .bind(timeout_secs)
                .fetch_one(conn),
        )?;
        debug!(lock = name, acquired = ?acquired, "advisory lock requested");
        Ok(acquired == Some(1))
    }

    pub fn release_lock(&mut self, name: &str) -> Result<(), StoreError> {
        let conn = &mut self.conn;
        let _: Option<i64> = self.runtime.block_on(
            sqlx::query_scalar::<MySql, Option<i64>>("SELECT RELEASE_LOCK(?)")
                .bind(name)
                .fetch_one(conn),
        )?;
        debug!(lock = name, "advisory lock released");
        Ok(())
    }
}

impl Destination for MySqlDestination {
    fn watermark(&mut self, table: &Identifier, column: &Identifier) -> Result<i64, StoreError> {
        let sql = format!(
            "SELECT CAST(COALESCE(MAX({}), 0) AS SIGNED) FROM {}",
            column.quoted(),
            table.quoted()
        );
        let conn = &mut self.conn;
        let watermark: i64 = self
            .runtime
            .block_on(sqlx::query_scalar::<MySql, i64>(&sql).fetch_one(conn))?;
        debug!(table = %table, column = %column, watermark, "read watermark");
        Ok(watermark)
    }

    fn table_schema(&mut self, table: &Identifier) -> Result<Option<TableSchema>, StoreError> {
        let conn = &mut self.conn;
        let columns: Vec<(String, String, i64)> = self.runtime.block_on(
            sqlx::query_as::<MySql, (String, String, i64)>(
                "SELECT CAST(COLUMN_NAME AS CHAR), CAST(IS_NULLABLE AS CHAR), \
                 CAST(COLUMN_DEFAULT IS NOT NULL OR EXTRA LIKE '%auto_increment%' AS SIGNED) \
                 FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                 ORDER BY ORDINAL_POSITION",
            )
            .bind(table.as_str())
            .fetch_all(conn),
        )?;
        if columns.is_empty() {
            return Err(StoreError::UnknownTable(table.to_string()));
        }
        let columns = columns
            .into_iter()
            .map(|(name, nullable, has_default)| ColumnDef {
                name,
                nullable: nullable.eq_ignore_ascii_case("YES"),
                has_default: has_default != 0,
            })
            .collect();
        Ok(Some(TableSchema::new(table.as_str(), columns)))
    }

    fn insert_batch(&mut self, statement: &InsertStatement) -> Result<u64, StoreError> {
        let head = statement.head();
        let conn = &mut self.conn;
        let written = self.runtime.block_on(async {
            let mut tx = conn.begin().await?;
            let mut written = 0u64;
            for chunk in statement.chunks(MAX_BIND_PARAMETERS) {
                let mut builder = QueryBuilder::<MySql>::new(head.as_str());
                builder.push_values(chunk, |mut tuple, row| {
                    for value in row {
                        push_value(&mut tuple, value);
                    }
                });
                written += builder.build().execute(&mut *tx).await?.rows_affected();
                debug!(table = %statement.table(), rows = chunk.len(), "inserted chunk");
            }
            // Dropping an uncommitted transaction rolls it back
            tx.commit().await?;
            Ok::<_, sqlx::Error>(written)
        })?;
        info!(table = %statement.table(), rows = written, "committed batch");
        Ok(written)
    }
}

/// A read-only MySQL extraction source.
pub struct MySqlSource {
    runtime: Runtime,
    conn: MySqlConnection,
}

impl MySqlSource {
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let runtime = runtime()?;
        let conn = runtime.block_on(MySqlConnection::connect(url))?;
        info!("connected to source database");
        Ok(Self { runtime, conn })
    }

    /// Run a query and convert every row into a source record.
    pub fn fetch(&mut self, sql: &str) -> Result<SourceRecordSet, StoreError> {
        let conn = &mut self.conn;
        let rows: Vec<MySqlRow> = self
            .runtime
            .block_on(sqlx::query::<MySql>(sql).fetch_all(conn))?;

        let columns: Vec<String> = rows.first().map_or_else(Vec::new, |row| {
            row.columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect()
        });
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = Row::new();
            for (idx, column) in row.columns().iter().enumerate() {
                let cell = cell_at(row, idx, column.type_info().name())?;
                record.set(column.name().to_string(), cell);
            }
            records.push(record);
        }
        info!(rows = records.len(), "fetched source rows");
        Ok(SourceRecordSet::new(columns, records))
    }
}

fn cell_at(row: &MySqlRow, idx: usize, type_name: &str) -> Result<Option<Cell>, StoreError> {
    let cell = match type_name {
        "NULL" => None,
        "BOOLEAN" => row.try_get::<Option<bool>, _>(idx)?.map(Cell::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<Option<i64>, _>(idx)?.map(Cell::Int)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row.try_get::<Option<u64>, _>(idx)?.map(|v| {
            i64::try_from(v).map_or_else(|_| Cell::Float(v as f64), Cell::Int)
        }),
        "YEAR" => row
            .try_get_unchecked::<Option<u16>, _>(idx)?
            .map(|year| Cell::Int(i64::from(year))),
        "FLOAT" | "DOUBLE" => row.try_get::<Option<f64>, _>(idx)?.map(Cell::Float),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(idx)?.map(Cell::Date),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(Cell::DateTime),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(idx)?
            .and_then(|time| Cell::text(time.format("%H:%M:%S").to_string())),
        "BIT" => row
            .try_get_unchecked::<Option<Vec<u8>>, _>(idx)?
            .map(|bytes| bit_value(&bytes).ok_or_else(|| unsupported(row, idx, type_name)))
            .transpose()?,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
            .try_get::<Option<Vec<u8>>, _>(idx)?
            .map(|bytes| bytes_cell(bytes).ok_or_else(|| unsupported(row, idx, type_name)))
            .transpose()?
            .flatten(),
        "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET"
        | "DECIMAL" | "JSON" => row
            .try_get_unchecked::<Option<String>, _>(idx)?
            .and_then(Cell::text),
        _ => return Err(unsupported(row, idx, type_name)),
    };
    Ok(cell)
}

fn unsupported(row: &MySqlRow, idx: usize, type_name: &str) -> StoreError {
    StoreError::UnsupportedColumn {
        column: row.columns()[idx].name().to_string(),
        type_name: type_name.to_string(),
    }
}

/// Big-endian BIT(n) payload as an integer; wider than 63 bits is refused.
fn bit_value(bytes: &[u8]) -> Option<Cell> {
    let value = bytes
        .iter()
        .try_fold(0u64, |acc, byte| acc.checked_mul(256).map(|acc| acc | u64::from(*byte)))?;
    i64::try_from(value).ok().map(Cell::Int)
}

/// Binary payloads are only accepted when they hold UTF-8 text.
fn bytes_cell(bytes: Vec<u8>) -> Option<Option<Cell>> {
    String::from_utf8(bytes).ok().map(Cell::text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_columns_read_big_endian() {
        assert_eq!(bit_value(&[0x01]), Some(Cell::Int(1)));
        assert_eq!(bit_value(&[0x01, 0x00]), Some(Cell::Int(256)));
        assert_eq!(bit_value(&[]), Some(Cell::Int(0)));
        assert_eq!(bit_value(&[0xff; 8]), None);
    }

    #[test]
    fn binary_columns_must_hold_text() {
        assert_eq!(bytes_cell(b"P1107".to_vec()), Some(Cell::text("P1107")));
        assert_eq!(bytes_cell(b"  ".to_vec()), Some(None));
        assert_eq!(bytes_cell(vec![0xff, 0xfe, 0x00]), None);
    }

    #[test]
    fn chunks_fit_the_prepared_statement_limit() {
        let mut table = hrb_model::DestinationTable::new(
            "person_attribute",
            (0..7).map(|i| format!("c{i}")).collect(),
        );
        for _ in 0..10_000 {
            table.push((0..7).map(Value::Int).collect()).unwrap();
        }
        let statement = InsertStatement::new(&table).unwrap();
        let sizes: Vec<usize> = statement.chunks(MAX_BIND_PARAMETERS).map(<[_]>::len).collect();
        assert_eq!(sizes, vec![9_362, 638]);
        assert!(sizes.iter().all(|rows| rows * 7 <= MAX_BIND_PARAMETERS));
    }
}

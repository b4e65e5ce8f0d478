//! Table loading with identifier validation and all-or-nothing batches.

use tracing::{error, info};

use hrb_model::{DestinationTable, RunReport};

use crate::destination::Destination;
use crate::error::{LoadError, Result};
use crate::statement::InsertStatement;

/// Persist one derived table and return the number of rows written.
///
/// Identifiers are validated before the destination is touched, then checked
/// against the destination's schema when it can describe one. An empty table
/// is a no-op. Store failures roll the whole table back and come back as
/// [`LoadError::PersistenceFailure`] with the cause attached.
pub fn load<D: Destination + ?Sized>(destination: &mut D, table: &DestinationTable) -> Result<u64> {
    if table.is_empty() {
        info!(table = table.name(), "nothing to load");
        return Ok(0);
    }

    let statement = InsertStatement::new(table)?;
    let persistence = |source| LoadError::PersistenceFailure {
        table: table.name().to_string(),
        source,
    };

    if let Some(schema) = destination
        .table_schema(statement.table())
        .map_err(persistence)?
    {
        statement.check_columns(&schema)?;
    }

    let written = destination.insert_batch(&statement).map_err(persistence)?;
    info!(table = table.name(), rows = written, "loaded table");
    Ok(written)
}

/// Load tables in the given order, recording each write in `report`.
///
/// Stops at the first failing table; tables after it are not attempted.
/// The failure is recorded in the report and returned.
pub fn load_in_order<D: Destination + ?Sized>(
    destination: &mut D,
    tables: &[DestinationTable],
    report: &mut RunReport,
) -> Result<()> {
    for table in tables {
        match load(destination, table) {
            Ok(written) => report.record_write(table.name(), written),
            Err(err) => {
                error!(table = table.name(), error = %err, "table load failed");
                report.record_failure(table.name(), err.to_string());
                return Err(err);
            }
        }
    }
    Ok(())
}

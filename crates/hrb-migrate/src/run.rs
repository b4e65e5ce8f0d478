//! One migration run against a destination.

use tracing::info;

use hrb_load::{Destination, Identifier, load_in_order};
use hrb_model::{RunReport, SourceRecordSet};

use crate::allocator::IdentityAllocator;
use crate::error::{MigrateError, Result};
use crate::prison::{MigrationSettings, PERSON_ID_COLUMN, PERSON_TABLE, build_prison_tables};
use crate::records::{ArtHistoryRecord, PrisonerRecord, SourceRecord, parse_records};

/// Extracted source tables for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrisonSource {
    pub prisoners: SourceRecordSet,
    pub art_history: SourceRecordSet,
}

/// Read the largest allocated person id.
pub fn read_watermark<D: Destination + ?Sized>(destination: &mut D) -> Result<i64> {
    let table = Identifier::parse(PERSON_TABLE)?;
    let column = Identifier::parse(PERSON_ID_COLUMN)?;
    destination
        .watermark(&table, &column)
        .map_err(|source| MigrateError::Watermark {
            table: PERSON_TABLE.to_string(),
            column: PERSON_ID_COLUMN.to_string(),
            source,
        })
}

/// Parse, allocate, build and load.
///
/// The caller holds whatever lock keeps other writers out between the
/// watermark read and the last insert. Writes and skipped records land in
/// `report` as they happen, so it stays accurate when the run stops early.
pub fn run_migration<D: Destination + ?Sized>(
    source: &PrisonSource,
    destination: &mut D,
    settings: &MigrationSettings,
    report: &mut RunReport,
) -> Result<()> {
    let (prisoners, skipped) = parse_records::<PrisonerRecord>(&source.prisoners);
    report.extend_diagnostics(skipped);
    let (history, skipped) = parse_records::<ArtHistoryRecord>(&source.art_history);
    report.extend_diagnostics(skipped);

    let watermark = read_watermark(destination)?;
    let ids = IdentityAllocator::from_watermark(watermark)
        .assign(prisoners.iter().map(SourceRecord::source_key))?;
    info!(watermark, prisoners = ids.len(), "allocated person ids");

    let plan = build_prison_tables(&prisoners, &history, &ids, settings)?;
    report.extend_diagnostics(plan.diagnostics);
    load_in_order(destination, &plan.tables, report)?;
    info!(rows = report.total_rows(), "migration complete");
    Ok(())
}

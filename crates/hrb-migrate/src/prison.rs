//! Prison health records into the destination's person and patient tables.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{info, warn};

use hrb_model::{DestinationTable, Diagnostic, DimensionKind, DimensionTable, Issue, Value};

use crate::allocator::IdentityMap;
use crate::builder::{ColumnSource, Melt, NpidFormat, Projection};
use crate::error::Result;
use crate::records::{ArtHistoryRecord, FromRow, PrisonerRecord, SourceRecord};

pub const PRISONERS_QUERY: &str = "SELECT * FROM prisoners";
pub const ART_HISTORY_QUERY: &str = "SELECT * FROM art_history_at_entry";

/// Table and column whose maximum seeds identity allocation.
pub const PERSON_TABLE: &str = "person";
pub const PERSON_ID_COLUMN: &str = "person_id";

/// Prisoner columns melted into `person_attribute`.
pub const PRISONER_ATTRIBUTES: [&str; 11] = [
    "education_level",
    "religion",
    "denomination",
    "nationality",
    "next_of_kin_name",
    "next_of_kin_contact",
    "prisoners_no",
    "entry_date",
    "gender",
    "cell",
    "status",
];

/// ART history columns melted into `person_attribute`.
pub const HISTORY_ATTRIBUTES: [&str; 5] = ["HIV_status", "on_ART", "Hx_of_TB", "Hx_of_STI", "DM"];

/// Destination constants and type tables for a prison migration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// User id recorded as the creator of every row.
    pub creator: i64,
    pub program_id: i64,
    pub location_id: i64,
    pub npid: NpidFormat,
    /// Source column to `person_attribute_type_id`.
    pub attribute_types: BTreeMap<String, i64>,
    /// Source column to `patient_identifier.identifier_type`.
    pub identifier_types: BTreeMap<String, i64>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        let attribute_types = [
            ("education_level", 28),
            ("religion", 29),
            ("nationality", 3),
            ("next_of_kin_name", 24),
            ("next_of_kin_contact", 39),
            ("prisoners_no", 40),
            ("entry_date", 41),
            ("status", 42),
            ("gender", 43),
            ("cell", 44),
            ("Hx_of_TB", 46),
            ("Hx_of_STI", 47),
            ("HIV_status", 48),
            ("on_ART", 49),
            ("DM", 50),
        ];
        let identifier_types = [("npid", 3), ("national_id", 28), ("prisoners_no", 30)];
        Self {
            creator: 1,
            program_id: 8,
            location_id: 1067,
            npid: NpidFormat::default(),
            attribute_types: attribute_types
                .into_iter()
                .map(|(code, id)| (code.to_string(), id))
                .collect(),
            identifier_types: identifier_types
                .into_iter()
                .map(|(code, id)| (code.to_string(), id))
                .collect(),
        }
    }
}

impl MigrationSettings {
    pub fn attribute_table(&self) -> Result<DimensionTable<i64>> {
        let table =
            DimensionTable::from_entries(DimensionKind::AttributeType, self.attribute_types.clone())?;
        Ok(table)
    }

    pub fn identifier_table(&self) -> Result<DimensionTable<i64>> {
        let table = DimensionTable::from_entries(
            DimensionKind::IdentifierType,
            self.identifier_types.clone(),
        )?;
        Ok(table)
    }

    fn creator(&self) -> ColumnSource {
        ColumnSource::Constant(Value::Int(self.creator))
    }
}

/// Derived tables in load order plus everything left out of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    pub tables: Vec<DestinationTable>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MigrationPlan {
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(DestinationTable::len).sum()
    }
}

/// Build every destination table from parsed records and frozen identities.
///
/// Tables come out in dependency order: `person` first, then the tables
/// keyed by `person_id` or `patient_id`. ART history rows whose prisoner was
/// not migrated are dropped and reported.
pub fn build_prison_tables(
    prisoners: &[PrisonerRecord],
    history: &[ArtHistoryRecord],
    ids: &IdentityMap,
    settings: &MigrationSettings,
) -> Result<MigrationPlan> {
    let attribute_types = settings.attribute_table()?;
    let identifier_types = settings.identifier_table()?;
    let date_created = || ColumnSource::field("created_at");
    let mut plan = MigrationPlan::default();

    plan.tables.push(
        Projection::new("person")
            .column("person_id", ColumnSource::DestinationId)
            .column("gender", ColumnSource::field("gender"))
            .column("birthdate", ColumnSource::field("dob"))
            .column("birthdate_estimated", ColumnSource::Constant(Value::Int(0)))
            .column("date_created", date_created())
            .column("creator", settings.creator())
            .column("uuid", ColumnSource::Token)
            .build(prisoners, ids)?,
    );

    plan.tables.push(
        Projection::new("person_name")
            .column("person_id", ColumnSource::DestinationId)
            .column("given_name", ColumnSource::field("fname"))
            .column("family_name", ColumnSource::field("lname"))
            .column("middle_name", ColumnSource::field("alias"))
            .column("preferred", ColumnSource::Constant(Value::Int(0)))
            .column("date_created", date_created())
            .column("creator", settings.creator())
            .column("uuid", ColumnSource::Token)
            .build(prisoners, ids)?,
    );

    plan.tables.push(
        Projection::new("patient")
            .column("patient_id", ColumnSource::DestinationId)
            .column("date_created", date_created())
            .column("creator", settings.creator())
            .build(prisoners, ids)?,
    );

    plan.tables.push(
        Projection::new("patient_program")
            .column("patient_id", ColumnSource::DestinationId)
            .column("program_id", ColumnSource::Constant(Value::Int(settings.program_id)))
            .column("date_enrolled", ColumnSource::field("entry_date"))
            .column("date_created", date_created())
            .column("creator", settings.creator())
            .column("uuid", ColumnSource::Token)
            .build(prisoners, ids)?,
    );

    let attributes = PRISONER_ATTRIBUTES
        .iter()
        .fold(
            Melt::new("person_attribute", "person_attribute_type_id", "value")
                .id("person_id", ColumnSource::DestinationId)
                .id("date_created", date_created())
                .id("creator", settings.creator()),
            |melt, column| melt.variable(*column),
        )
        .token("uuid")
        .build(prisoners, ids, &attribute_types)?;
    plan.tables.push(attributes.table);
    plan.diagnostics.extend(attributes.diagnostics);

    plan.tables.push(
        Projection::new("person_address")
            .column("person_id", ColumnSource::DestinationId)
            .column("address2", ColumnSource::field("home_district"))
            .column("county_district", ColumnSource::field("home_ta"))
            .column("neighborhood_cell", ColumnSource::field("home_village"))
            .column("state_province", ColumnSource::field("residential_district"))
            .column("township_division", ColumnSource::field("residential_ta"))
            .column("city_village", ColumnSource::field("residential_village"))
            .column("date_created", date_created())
            .column("creator", settings.creator())
            .column("uuid", ColumnSource::Token)
            .build(prisoners, ids)?,
    );

    let identifiers = Melt::new("patient_identifier", "identifier_type", "identifier")
        .id("patient_id", ColumnSource::DestinationId)
        .id("date_created", date_created())
        .id("creator", settings.creator())
        .id("location_id", ColumnSource::Constant(Value::Int(settings.location_id)))
        .variable("prisoners_no")
        .variable("national_id")
        .computed_variable("npid", ColumnSource::Npid(settings.npid.clone()))
        .token("uuid")
        .build(prisoners, ids, &identifier_types)?;
    plan.tables.push(identifiers.table);
    plan.diagnostics.extend(identifiers.diagnostics);

    let (matched, unmatched) = join_history(history, ids);
    plan.diagnostics.extend(unmatched);
    let medical = HISTORY_ATTRIBUTES
        .iter()
        .fold(
            Melt::new("person_attribute", "person_attribute_type_id", "value")
                .id("person_id", ColumnSource::DestinationId)
                .id("date_created", date_created())
                .id("creator", settings.creator()),
            |melt, column| melt.variable(*column),
        )
        .token("uuid")
        .build(&matched, ids, &attribute_types)?;
    plan.tables.push(medical.table);
    plan.diagnostics.extend(medical.diagnostics);

    info!(
        prisoners = prisoners.len(),
        tables = plan.tables.len(),
        rows = plan.row_count(),
        "built migration tables"
    );
    Ok(plan)
}

/// Inner join of ART history onto migrated prisoners by source id.
fn join_history(
    history: &[ArtHistoryRecord],
    ids: &IdentityMap,
) -> (Vec<ArtHistoryRecord>, Vec<Diagnostic>) {
    let mut matched = Vec::with_capacity(history.len());
    let mut unmatched = Vec::new();
    for record in history {
        let key = record.source_key();
        if ids.get(key).is_some() {
            matched.push(record.clone());
            continue;
        }
        warn!(key = %key, "ART history row has no migrated prisoner");
        unmatched.push(Diagnostic::row(
            record.source_row,
            Some(format!("prisoners_no {key}")),
            Issue::UnmatchedJoinKey {
                table: ArtHistoryRecord::TABLE.to_string(),
                key: key.to_string(),
            },
        ));
    }
    (matched, unmatched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_the_destination_dictionary() {
        let settings = MigrationSettings::default();
        let attributes = settings.attribute_table().unwrap();
        assert_eq!(attributes.get("HIV_status"), Some(&48));
        assert!(!attributes.contains("denomination"));
        let identifiers = settings.identifier_table().unwrap();
        assert_eq!(identifiers.get("npid"), Some(&3));
        assert_eq!(settings.npid.render(hrb_model::DestinationId(5)), "P11070000005");
    }

    #[test]
    fn settings_overlay_defaults() {
        let settings: MigrationSettings =
            serde_json::from_str(r#"{"creator": 9, "npid": {"prefix": "P2"}}"#).unwrap();
        assert_eq!(settings.creator, 9);
        assert_eq!(settings.npid.prefix, "P2");
        assert_eq!(settings.npid.width, 7);
        assert_eq!(settings.program_id, 8);
    }

    #[test]
    fn unmatched_history_keeps_its_source_row() {
        use crate::allocator::IdentityAllocator;
        use crate::records::parse_records;
        use hrb_model::{Cell, Row, SourceKey, SourceRecordSet};

        let history = |prisoner: Option<i64>| {
            Row::new()
                .with("prisoners_no", prisoner.map(Cell::Int))
                .with("created_at", Some(Cell::from("2024-03-01 10:00:00")))
        };
        let records = SourceRecordSet::from_rows(vec![
            history(None),
            history(Some(500)),
            history(Some(999)),
        ]);
        let (parsed, skipped) = parse_records::<ArtHistoryRecord>(&records);
        assert_eq!(skipped.len(), 1);

        let ids = IdentityAllocator::from_watermark(0)
            .assign([SourceKey(500)])
            .unwrap();
        let (matched, unmatched) = join_history(&parsed, &ids);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].source_row, 1);
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].row, Some(2));
    }
}

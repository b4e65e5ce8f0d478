//! Typed source records, validated once at the record set boundary.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::warn;

use hrb_model::{Cell, Diagnostic, Row, RowError, SourceKey, SourceRecordSet};

/// A source record that dependent tables can be derived from.
pub trait SourceRecord {
    /// Natural key used to look up the record's destination identity.
    fn source_key(&self) -> SourceKey;

    /// Named field value; `None` when absent.
    fn field(&self, name: &str) -> Option<Cell>;
}

/// Conversion from an untyped row.
pub trait FromRow: Sized {
    /// Source table name, used in diagnostics.
    const TABLE: &'static str;

    /// `source_row` is the zero-based position of `row` in its record set.
    fn from_row(row: &Row, source_row: usize) -> Result<Self, RowError>;
}

/// Parse every row, skipping and reporting the ones that fail validation.
pub fn parse_records<T: FromRow>(records: &SourceRecordSet) -> (Vec<T>, Vec<Diagnostic>) {
    let mut parsed = Vec::with_capacity(records.len());
    let mut diagnostics = Vec::new();
    for (idx, row) in records.iter().enumerate() {
        match T::from_row(row, idx) {
            Ok(record) => parsed.push(record),
            Err(err) => {
                // Position only: row errors may carry personal values
                warn!(table = T::TABLE, row = idx, "skipping source row");
                let identity = row.get("id").map(|id| format!("{} id {id}", T::TABLE));
                diagnostics.push(Diagnostic::row(idx, identity, err));
            }
        }
    }
    (parsed, diagnostics)
}

fn required_integer(row: &Row, column: &str) -> Result<i64, RowError> {
    let cell = row.get(column).ok_or_else(|| RowError::MissingField {
        column: column.to_string(),
    })?;
    cell.exact_integer().ok_or_else(|| RowError::InvalidField {
        column: column.to_string(),
        value: cell.to_string(),
    })
}

/// Trimmed text of a present cell. Numbers are rendered without trailing zeros.
fn text(row: &Row, column: &str) -> Option<String> {
    row.get(column).map(|cell| cell.to_string().trim().to_string())
}

fn optional_date(row: &Row, column: &str) -> Result<Option<NaiveDate>, RowError> {
    row.get(column)
        .map(|cell| {
            cell.as_date().ok_or_else(|| RowError::InvalidField {
                column: column.to_string(),
                value: cell.to_string(),
            })
        })
        .transpose()
}

fn required_datetime(row: &Row, column: &str) -> Result<NaiveDateTime, RowError> {
    let cell = row.get(column).ok_or_else(|| RowError::MissingField {
        column: column.to_string(),
    })?;
    cell.as_datetime().ok_or_else(|| RowError::InvalidField {
        column: column.to_string(),
        value: cell.to_string(),
    })
}

/// `"  male"` becomes `"M"`; unrecognized values are kept, capitalized.
pub fn normalize_gender(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };
    match capitalized.as_str() {
        "Male" => "M".to_string(),
        "Female" => "F".to_string(),
        _ => capitalized,
    }
}

/// Map screening answers to the destination's HIV status codes.
pub fn normalize_hiv_status(raw: &str) -> String {
    match raw.trim() {
        "Prev Positive" => "KP".to_string(),
        "Prev Negative" => "KN".to_string(),
        "Never Tested" => "UK".to_string(),
        other => other.to_string(),
    }
}

fn text_cell(value: Option<&String>) -> Option<Cell> {
    value.and_then(|value| Cell::text(value.as_str()))
}

/// One row of the source `prisoners` table.
#[derive(Debug, Clone, PartialEq)]
pub struct PrisonerRecord {
    pub source_row: usize,
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub alias: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub entry_date: Option<NaiveDate>,
    pub prisoners_no: Option<String>,
    pub national_id: Option<String>,
    pub education_level: Option<String>,
    pub religion: Option<String>,
    pub denomination: Option<String>,
    pub nationality: Option<String>,
    pub next_of_kin_name: Option<String>,
    pub next_of_kin_contact: Option<String>,
    pub cell: Option<String>,
    pub status: Option<String>,
    pub home_district: Option<String>,
    pub home_ta: Option<String>,
    pub home_village: Option<String>,
    pub residential_district: Option<String>,
    pub residential_ta: Option<String>,
    pub residential_village: Option<String>,
}

impl FromRow for PrisonerRecord {
    const TABLE: &'static str = "prisoners";

    fn from_row(row: &Row, source_row: usize) -> Result<Self, RowError> {
        Ok(Self {
            source_row,
            id: required_integer(row, "id")?,
            first_name: text(row, "fname"),
            last_name: text(row, "lname"),
            alias: text(row, "alias"),
            gender: text(row, "gender").map(|raw| normalize_gender(&raw)),
            birthdate: optional_date(row, "dob")?,
            created_at: required_datetime(row, "created_at")?,
            entry_date: optional_date(row, "entry_date")?,
            prisoners_no: text(row, "prisoners_no"),
            national_id: text(row, "national_id"),
            education_level: text(row, "education_level"),
            religion: text(row, "religion"),
            denomination: text(row, "denomination"),
            nationality: text(row, "nationality"),
            next_of_kin_name: text(row, "next_of_kin_name"),
            next_of_kin_contact: text(row, "next_of_kin_contact"),
            cell: text(row, "cell"),
            status: text(row, "status"),
            home_district: text(row, "home_district"),
            home_ta: text(row, "home_ta"),
            home_village: text(row, "home_village"),
            residential_district: text(row, "residential_district"),
            residential_ta: text(row, "residential_ta"),
            residential_village: text(row, "residential_village"),
        })
    }
}

impl SourceRecord for PrisonerRecord {
    fn source_key(&self) -> SourceKey {
        SourceKey(self.id)
    }

    fn field(&self, name: &str) -> Option<Cell> {
        let text = match name {
            "id" => return Some(Cell::Int(self.id)),
            "dob" | "birthdate" => return self.birthdate.map(Cell::Date),
            "created_at" | "date_created" => return Some(Cell::DateTime(self.created_at)),
            "entry_date" => return self.entry_date.map(Cell::Date),
            "fname" => &self.first_name,
            "lname" => &self.last_name,
            "alias" => &self.alias,
            "gender" => &self.gender,
            "prisoners_no" => &self.prisoners_no,
            "national_id" => &self.national_id,
            "education_level" => &self.education_level,
            "religion" => &self.religion,
            "denomination" => &self.denomination,
            "nationality" => &self.nationality,
            "next_of_kin_name" => &self.next_of_kin_name,
            "next_of_kin_contact" => &self.next_of_kin_contact,
            "cell" => &self.cell,
            "status" => &self.status,
            "home_district" => &self.home_district,
            "home_ta" => &self.home_ta,
            "home_village" => &self.home_village,
            "residential_district" => &self.residential_district,
            "residential_ta" => &self.residential_ta,
            "residential_village" => &self.residential_village,
            _ => return None,
        };
        text_cell(text.as_ref())
    }
}

/// One row of the source `art_history_at_entry` table.
///
/// `prisoners_no` holds the prisoner's source `id`, which is the join key.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtHistoryRecord {
    pub source_row: usize,
    pub prisoner_id: i64,
    pub hiv_status: Option<String>,
    pub on_art: Option<String>,
    pub tb_history: Option<String>,
    pub sti_history: Option<String>,
    pub diabetes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl FromRow for ArtHistoryRecord {
    const TABLE: &'static str = "art_history_at_entry";

    fn from_row(row: &Row, source_row: usize) -> Result<Self, RowError> {
        Ok(Self {
            source_row,
            prisoner_id: required_integer(row, "prisoners_no")?,
            hiv_status: text(row, "HIV_status").map(|raw| normalize_hiv_status(&raw)),
            on_art: text(row, "on_ART"),
            tb_history: text(row, "Hx_of_TB"),
            sti_history: text(row, "Hx_of_STI"),
            diabetes: text(row, "DM"),
            created_at: required_datetime(row, "created_at")?,
        })
    }
}

impl SourceRecord for ArtHistoryRecord {
    fn source_key(&self) -> SourceKey {
        SourceKey(self.prisoner_id)
    }

    fn field(&self, name: &str) -> Option<Cell> {
        let text = match name {
            "prisoners_no" => return Some(Cell::Int(self.prisoner_id)),
            "created_at" | "date_created" => return Some(Cell::DateTime(self.created_at)),
            "HIV_status" => &self.hiv_status,
            "on_ART" => &self.on_art,
            "Hx_of_TB" => &self.tb_history,
            "Hx_of_STI" => &self.sti_history,
            "DM" => &self.diabetes,
            _ => return None,
        };
        text_cell(text.as_ref())
    }
}

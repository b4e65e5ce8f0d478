//! Row- and fact-scoped problems that are reported instead of aborting a run.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::lookup::DimensionKind;

/// A recoverable problem with a single source row or value.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum RowError {
    #[error("unknown {kind} code '{code}'")]
    UnknownDimensionCode { kind: DimensionKind, code: String },

    #[error("no {kind} value in column '{column}'")]
    MissingDimension { kind: DimensionKind, column: String },

    #[error("undefined period (year: {}, month: {})", display_opt(.year), display_opt(.month))]
    UndefinedPeriod {
        year: Option<String>,
        month: Option<String>,
    },

    #[error("invalid count '{value}' in column '{column}'")]
    InvalidFactValue { column: String, value: String },

    #[error("required field '{column}' is missing")]
    MissingField { column: String },

    #[error("field '{column}' has unusable value '{value}'")]
    InvalidField { column: String, value: String },
}

fn display_opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("<missing>")
}

/// Why something was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum Issue {
    Row(RowError),
    /// Zero counts suppressed by a strictly-positive submission policy.
    ZeroValue { column: String },
    /// A melt column with no destination type; every row drops it.
    UnmappedAttribute { table: String, column: String },
    /// A dependent record whose join key matched no allocated identity.
    UnmatchedJoinKey { table: String, key: String },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row(err) => write!(f, "{err}"),
            Self::ZeroValue { column } => write!(f, "zero count in '{column}' not submitted"),
            Self::UnmappedAttribute { table, column } => {
                write!(f, "{table}: column '{column}' has no type mapping")
            }
            Self::UnmatchedJoinKey { table, key } => {
                write!(f, "{table}: join key '{key}' matched no migrated record")
            }
        }
    }
}

impl From<RowError> for Issue {
    fn from(err: RowError) -> Self {
        Self::Row(err)
    }
}

/// How much of the input a diagnostic affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Row,
    Fact,
    Column,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Row => "row",
            Self::Fact => "fact",
            Self::Column => "column",
        })
    }
}

/// One skipped-input record: reason plus minimal row identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub scope: Scope,
    /// Zero-based index into the source record set.
    pub row: Option<usize>,
    /// Human-readable identity such as a facility/period or source key.
    pub identity: Option<String>,
    pub issue: Issue,
}

impl Diagnostic {
    pub fn row(row: usize, identity: Option<String>, issue: impl Into<Issue>) -> Self {
        Self {
            scope: Scope::Row,
            row: Some(row),
            identity,
            issue: issue.into(),
        }
    }

    pub fn fact(row: Option<usize>, identity: Option<String>, issue: impl Into<Issue>) -> Self {
        Self {
            scope: Scope::Fact,
            row,
            identity,
            issue: issue.into(),
        }
    }

    pub fn column(issue: impl Into<Issue>) -> Self {
        Self {
            scope: Scope::Column,
            row: None,
            identity: None,
            issue: issue.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.scope)?;
        if let Some(row) = self.row {
            write!(f, " {row}")?;
        }
        if let Some(identity) = &self.identity {
            write!(f, " {identity}")?;
        }
        write!(f, "] {}", self.issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display_includes_identity() {
        let diag = Diagnostic::row(
            3,
            Some("KCH_OPD1".to_string()),
            RowError::UndefinedPeriod {
                year: Some("2025".to_string()),
                month: None,
            },
        );
        assert_eq!(
            diag.to_string(),
            "[row 3 KCH_OPD1] undefined period (year: 2025, month: <missing>)"
        );
    }

    #[test]
    fn column_diagnostics_have_no_row() {
        let diag = Diagnostic::column(Issue::UnmappedAttribute {
            table: "person_attribute".to_string(),
            column: "denomination".to_string(),
        });
        assert_eq!(diag.row, None);
        assert_eq!(diag.scope, Scope::Column);
    }

    #[test]
    fn dimension_errors_serialize_with_their_kind() {
        let diag = Diagnostic::row(
            0,
            Some("Nowhere".to_string()),
            RowError::UnknownDimensionCode {
                kind: DimensionKind::OrgUnit,
                code: "Nowhere".to_string(),
            },
        );
        let json = serde_json::to_value(&diag).unwrap();
        let issue = &json["issue"];
        assert_eq!(issue["issue"], "row");
        assert_eq!(issue["error"], "unknown_dimension_code");
        assert_eq!(issue["kind"], serde_json::to_value(DimensionKind::OrgUnit).unwrap());
        assert_eq!(issue["code"], "Nowhere");

        let missing = serde_json::to_value(RowError::MissingDimension {
            kind: DimensionKind::CategoryOptionCombo,
            column: "AHD_eligible_category".to_string(),
        })
        .unwrap();
        assert_eq!(missing["error"], "missing_dimension");
        assert_eq!(missing["column"], "AHD_eligible_category");
    }
}

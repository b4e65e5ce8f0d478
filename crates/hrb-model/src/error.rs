use thiserror::Error;

use crate::lookup::DimensionKind;

/// Structural errors raised while building model values.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("required column '{column}' not found in source records")]
    MissingColumn { column: String },

    #[error("{kind} lookup table lists code '{code}' more than once")]
    DuplicateCode { kind: DimensionKind, code: String },

    #[error("row for '{table}' has {found} values, expected {expected}")]
    RowWidth {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid period '{0}', expected YYYYMM")]
    InvalidPeriod(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

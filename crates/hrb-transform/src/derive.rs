//! Per-row arithmetic that runs before reshaping.

use serde::Deserialize;

use hrb_model::{Cell, Row};

/// A column computed from other columns of the same row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DerivedColumn {
    /// `target = minuend - subtrahend`, e.g. negatives from totals and positives.
    Difference {
        target: String,
        minuend: String,
        subtrahend: String,
    },
}

impl DerivedColumn {
    pub fn difference(
        target: impl Into<String>,
        minuend: impl Into<String>,
        subtrahend: impl Into<String>,
    ) -> Self {
        Self::Difference {
            target: target.into(),
            minuend: minuend.into(),
            subtrahend: subtrahend.into(),
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::Difference { target, .. } => target,
        }
    }

    /// Compute the rule on `row`, overwriting the target column.
    ///
    /// The target becomes absent only when an operand is absent, so a missing
    /// input never turns into a zero or a bare negative. An operand that is
    /// present but not an exact integer (NaN, `10.5`, `"ten"`) is copied into
    /// the target unchanged so the value policy reports it.
    pub fn apply(&self, row: &mut Row) {
        match self {
            Self::Difference {
                target,
                minuend,
                subtrahend,
            } => {
                let value = difference(row.get(minuend), row.get(subtrahend));
                row.set(target.clone(), value);
            }
        }
    }
}

fn difference(total: Option<&Cell>, part: Option<&Cell>) -> Option<Cell> {
    let invalid = [total, part]
        .into_iter()
        .flatten()
        .find(|cell| cell.exact_integer().is_none());
    if let Some(cell) = invalid {
        return Some(cell.clone());
    }
    let total = total?.exact_integer()?;
    let part = part?.exact_integer()?;
    Some(match total.checked_sub(part) {
        Some(value) => Cell::Int(value),
        // out of i64 range
        None => Cell::Float(f64::NAN),
    })
}

/// Apply rules in declaration order; later rules see earlier targets.
pub fn apply_derived(rules: &[DerivedColumn], row: &mut Row) {
    for rule in rules {
        rule.apply(row);
    }
}

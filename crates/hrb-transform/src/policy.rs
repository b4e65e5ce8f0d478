//! Count validation applied to facts before submission.

use serde::Deserialize;
use tracing::{debug, info};

use hrb_model::{DataValue, Diagnostic, Fact, Issue, RowError};

/// Which observed counts may be submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuePolicy {
    /// Zero and positive integers.
    NonNegative,
    /// Positive integers only; zeros are reported and withheld.
    #[default]
    StrictlyPositive,
}

/// Data values that passed the policy plus the facts that did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyOutput {
    pub values: Vec<DataValue>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValuePolicy {
    /// Validate one fact's value as a discrete count.
    ///
    /// Non-numeric text, NaN, infinities, fractions and negatives are invalid;
    /// nothing is rounded or clamped.
    pub fn check(self, fact: &Fact) -> Result<u64, Issue> {
        let invalid = || {
            Issue::Row(RowError::InvalidFactValue {
                column: fact.element_column.clone(),
                value: fact.value.to_string(),
            })
        };
        let count = fact.value.exact_integer().ok_or_else(invalid)?;
        let count = u64::try_from(count).map_err(|_| invalid())?;
        if count == 0 && self == Self::StrictlyPositive {
            return Err(Issue::ZeroValue {
                column: fact.element_column.clone(),
            });
        }
        Ok(count)
    }

    pub fn apply(self, facts: &[Fact]) -> PolicyOutput {
        let mut output = PolicyOutput::default();
        for fact in facts {
            match self.check(fact) {
                Ok(count) => output.values.push(fact.with_count(count)),
                Err(issue) => {
                    debug!(row = fact.source_row, column = %fact.element_column, "fact withheld");
                    let identity = format!("{} {}", fact.org_unit_id, fact.period);
                    output
                        .diagnostics
                        .push(Diagnostic::fact(Some(fact.source_row), Some(identity), issue));
                }
            }
        }
        info!(
            policy = ?self,
            accepted = output.values.len(),
            withheld = output.diagnostics.len(),
            "applied value policy"
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrb_model::{Cell, Period};

    fn fact(value: Cell) -> Fact {
        Fact {
            element_id: "zrbmZYhP2gO".to_string(),
            element_column: "CD4<200".to_string(),
            period: Period::new(2025, 1).unwrap(),
            org_unit_id: "RY0I8Ha0azq".to_string(),
            category_combo_id: "kUkskhxydV5".to_string(),
            attribute_combo_id: "HllvX50cXC0".to_string(),
            value,
            source_row: 0,
        }
    }

    #[test]
    fn integral_values_pass() {
        let policy = ValuePolicy::NonNegative;
        assert_eq!(policy.check(&fact(Cell::Int(4))), Ok(4));
        assert_eq!(policy.check(&fact(Cell::Float(6.0))), Ok(6));
        assert_eq!(policy.check(&fact(Cell::from("7"))), Ok(7));
        assert_eq!(policy.check(&fact(Cell::Int(0))), Ok(0));
    }

    #[test]
    fn bad_counts_are_invalid_not_coerced() {
        let policy = ValuePolicy::NonNegative;
        for value in [
            Cell::Float(2.5),
            Cell::Float(f64::NAN),
            Cell::Float(f64::INFINITY),
            Cell::Int(-1),
            Cell::from("n/a"),
            Cell::Bool(true),
        ] {
            assert!(matches!(
                policy.check(&fact(value)),
                Err(Issue::Row(RowError::InvalidFactValue { .. }))
            ));
        }
    }

    #[test]
    fn zero_is_withheld_under_strictly_positive() {
        let output = ValuePolicy::StrictlyPositive.apply(&[fact(Cell::Int(0)), fact(Cell::Int(3))]);
        assert_eq!(output.values.len(), 1);
        assert_eq!(output.values[0].value, 3);
        assert_eq!(
            output.diagnostics[0].issue,
            Issue::ZeroValue {
                column: "CD4<200".to_string()
            }
        );
        assert_eq!(output.diagnostics[0].identity.as_deref(), Some("RY0I8Ha0azq 202501"));
    }
}

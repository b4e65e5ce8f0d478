//! Long-format facts and the aggregate-data wire payload.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::period::Period;

/// One observed value tied to its dimensions, as emitted by reshaping.
///
/// The value is carried unvalidated; count validation is a separate policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub element_id: String,
    /// Source column the value was read from.
    pub element_column: String,
    pub period: Period,
    pub org_unit_id: String,
    pub category_combo_id: String,
    pub attribute_combo_id: String,
    pub value: Cell,
    /// Index of the source row that produced this fact.
    pub source_row: usize,
}

impl Fact {
    /// Attach a validated count, producing the wire representation.
    pub fn with_count(&self, value: u64) -> DataValue {
        DataValue {
            data_element: self.element_id.clone(),
            period: self.period,
            org_unit: self.org_unit_id.clone(),
            category_option_combo: self.category_combo_id.clone(),
            attribute_option_combo: self.attribute_combo_id.clone(),
            value,
        }
    }
}

/// A validated fact in the aggregate API's field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    pub data_element: String,
    pub period: Period,
    pub org_unit: String,
    pub category_option_combo: String,
    pub attribute_option_combo: String,
    pub value: u64,
}

/// The single JSON object posted per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValueSet {
    pub data_values: Vec<DataValue>,
}

impl DataValueSet {
    pub fn new(data_values: Vec<DataValue>) -> Self {
        Self { data_values }
    }

    pub fn len(&self) -> usize {
        self.data_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_values.is_empty()
    }
}

//! Wide reporting rows to long-format facts.

use std::borrow::Cow;

use serde::Deserialize;
use tracing::{debug, info};

use hrb_model::{
    Diagnostic, DimensionKind, DimensionResolver, Fact, Period, Row, RowError, SourceRecordSet,
};

use crate::derive::{DerivedColumn, apply_derived};
use crate::error::{Result, TransformError};

/// Where a row's category option combo comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    /// Resolve the label found in `column`. An empty cell uses `fallback`
    /// when one is configured and is otherwise a missing dimension.
    Column {
        column: String,
        #[serde(default)]
        fallback: Option<String>,
    },
    /// One category option combo id for every row.
    Fixed(String),
}

/// Column layout and dimensions of a wide reporting form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReshapeConfig {
    pub year_column: String,
    pub month_column: String,
    pub org_unit_column: String,
    pub category: CategorySource,
    pub attribute_option_combo: String,
    /// Columns whose values become facts, resolved as data element codes.
    pub element_columns: Vec<String>,
    /// Rules applied to each row before its facts are read.
    pub derived: Vec<DerivedColumn>,
}

/// One step of the reshape stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ReshapeEvent {
    Fact(Fact),
    Skipped(Diagnostic),
}

/// Facts and skipped-row diagnostics collected from a reshape stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReshapeOutput {
    pub facts: Vec<Fact>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ReshapeOutput {
    pub fn collect(events: impl IntoIterator<Item = ReshapeEvent>) -> Self {
        let mut output = Self::default();
        for event in events {
            match event {
                ReshapeEvent::Fact(fact) => output.facts.push(fact),
                ReshapeEvent::Skipped(diagnostic) => output.diagnostics.push(diagnostic),
            }
        }
        output
    }
}

impl FromIterator<ReshapeEvent> for ReshapeOutput {
    fn from_iter<I: IntoIterator<Item = ReshapeEvent>>(iter: I) -> Self {
        Self::collect(iter)
    }
}

/// Dimensions shared by every fact of one row.
struct RowDimensions<'a> {
    period: Period,
    org_unit_id: &'a str,
    category_combo_id: &'a str,
}

/// Reshapes rows of one reporting form against fixed lookup tables.
#[derive(Debug)]
pub struct FactReshaper<'a> {
    config: &'a ReshapeConfig,
    resolver: &'a DimensionResolver,
    /// `(column, data element id)` in configured order.
    elements: Vec<(String, String)>,
}

impl<'a> FactReshaper<'a> {
    /// Resolves every element column up front; an unmapped column is a
    /// configuration error rather than a per-row skip.
    pub fn new(config: &'a ReshapeConfig, resolver: &'a DimensionResolver) -> Result<Self> {
        if config.element_columns.is_empty() {
            return Err(TransformError::NoElementColumns);
        }
        let mut elements = Vec::with_capacity(config.element_columns.len());
        for column in &config.element_columns {
            let element_id = resolver
                .resolve(DimensionKind::DataElement, column)
                .map_err(|_| TransformError::UnmappedElement {
                    column: column.clone(),
                })?;
            elements.push((column.clone(), element_id.to_string()));
        }
        Ok(Self {
            config,
            resolver,
            elements,
        })
    }

    /// Lazily reshape every row. Re-run over the same input to restart.
    pub fn reshape<'r>(
        &'r self,
        records: &'r SourceRecordSet,
    ) -> impl Iterator<Item = ReshapeEvent> + 'r {
        records
            .iter()
            .enumerate()
            .flat_map(move |(idx, row)| self.reshape_row(idx, row))
    }

    /// Reshape everything and log the totals.
    pub fn reshape_all(&self, records: &SourceRecordSet) -> ReshapeOutput {
        let output = ReshapeOutput::collect(self.reshape(records));
        info!(
            rows = records.len(),
            facts = output.facts.len(),
            skipped = output.diagnostics.len(),
            "reshaped reporting rows"
        );
        output
    }

    fn reshape_row(&self, idx: usize, source: &Row) -> Vec<ReshapeEvent> {
        let row: Cow<'_, Row> = if self.config.derived.is_empty() {
            Cow::Borrowed(source)
        } else {
            let mut owned = source.clone();
            apply_derived(&self.config.derived, &mut owned);
            Cow::Owned(owned)
        };

        let dims = match self.row_dimensions(&row) {
            Ok(dims) => dims,
            Err(err) => {
                debug!(row = idx, error = %err, "skipping row");
                let identity = row.get(&self.config.org_unit_column).map(ToString::to_string);
                return vec![ReshapeEvent::Skipped(Diagnostic::row(idx, identity, err))];
            }
        };

        self.elements
            .iter()
            .filter_map(|(column, element_id)| {
                let value = row.get(column)?;
                Some(ReshapeEvent::Fact(Fact {
                    element_id: element_id.clone(),
                    element_column: column.clone(),
                    period: dims.period,
                    org_unit_id: dims.org_unit_id.to_string(),
                    category_combo_id: dims.category_combo_id.to_string(),
                    attribute_combo_id: self.config.attribute_option_combo.clone(),
                    value: value.clone(),
                    source_row: idx,
                }))
            })
            .collect()
    }

    fn row_dimensions(&self, row: &Row) -> std::result::Result<RowDimensions<'a>, RowError> {
        let config = self.config;
        let period = Period::from_cells(row.get(&config.year_column), row.get(&config.month_column))?;
        let org_unit_id = self.resolve_column(row, DimensionKind::OrgUnit, &config.org_unit_column)?;
        let category_combo_id = match &config.category {
            CategorySource::Fixed(id) => id.as_str(),
            CategorySource::Column { column, fallback } => match (row.get(column), fallback) {
                (None, Some(fallback)) => fallback.as_str(),
                _ => self.resolve_column(row, DimensionKind::CategoryOptionCombo, column)?,
            },
        };
        Ok(RowDimensions {
            period,
            org_unit_id,
            category_combo_id,
        })
    }

    fn resolve_column(
        &self,
        row: &Row,
        kind: DimensionKind,
        column: &str,
    ) -> std::result::Result<&'a str, RowError> {
        let code = row.get(column).ok_or_else(|| RowError::MissingDimension {
            kind,
            column: column.to_string(),
        })?;
        self.resolver.resolve(kind, &code.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrb_model::{Cell, DimensionTable, Issue};

    fn resolver() -> DimensionResolver {
        DimensionResolver::new()
            .with_table(
                DimensionTable::from_entries(
                    DimensionKind::OrgUnit,
                    [("KCH_OPD1", "RY0I8Ha0azq".to_string())],
                )
                .unwrap(),
            )
            .with_table(
                DimensionTable::from_entries(
                    DimensionKind::CategoryOptionCombo,
                    [("New_HIV_pos", "kUkskhxydV5".to_string())],
                )
                .unwrap(),
            )
            .with_table(
                DimensionTable::from_entries(
                    DimensionKind::DataElement,
                    [
                        ("TX_TB", "lGFG7F9AdD4".to_string()),
                        ("TX_KS", "whx2qNPkJKp".to_string()),
                    ],
                )
                .unwrap(),
            )
    }

    fn config(category: CategorySource) -> ReshapeConfig {
        ReshapeConfig {
            year_column: "Reporting_year".to_string(),
            month_column: "Reporting_month".to_string(),
            org_unit_column: "Facility".to_string(),
            category,
            attribute_option_combo: "HllvX50cXC0".to_string(),
            element_columns: vec!["TX_TB".to_string(), "TX_KS".to_string()],
            derived: Vec::new(),
        }
    }

    fn by_column() -> CategorySource {
        CategorySource::Column {
            column: "AHD_eligible_category".to_string(),
            fallback: None,
        }
    }

    fn row(month: &str) -> Row {
        Row::new()
            .with("Facility", Some(Cell::from("KCH_OPD1")))
            .with("Reporting_year", Some(Cell::Int(2025)))
            .with("Reporting_month", Some(Cell::from(month)))
            .with("AHD_eligible_category", Some(Cell::from("New_HIV_pos")))
    }

    #[test]
    fn unmapped_element_column_is_a_configuration_error() {
        let mut config = config(by_column());
        config.element_columns.push("TX_Unknown".to_string());
        let resolver = resolver();
        let err = FactReshaper::new(&config, &resolver).unwrap_err();
        assert!(matches!(err, TransformError::UnmappedElement { column } if column == "TX_Unknown"));
    }

    #[test]
    fn absent_element_skips_only_that_element() {
        let config = config(by_column());
        let resolver = resolver();
        let reshaper = FactReshaper::new(&config, &resolver).unwrap();
        let records = SourceRecordSet::from_rows(vec![
            row("Jan")
                .with("TX_TB", Some(Cell::Int(0)))
                .with("TX_KS", None),
        ]);

        let output = reshaper.reshape_all(&records);
        assert!(output.diagnostics.is_empty());
        assert_eq!(output.facts.len(), 1);
        assert_eq!(output.facts[0].element_id, "lGFG7F9AdD4");
        // Zero is an observed count at this stage
        assert_eq!(output.facts[0].value, Cell::Int(0));
        assert_eq!(output.facts[0].category_combo_id, "kUkskhxydV5");
    }

    #[test]
    fn undefined_period_skips_the_whole_row() {
        let config = config(by_column());
        let resolver = resolver();
        let reshaper = FactReshaper::new(&config, &resolver).unwrap();
        let records = SourceRecordSet::from_rows(vec![
            row("jan").with("TX_TB", Some(Cell::Int(2))),
            row("February").with("TX_TB", Some(Cell::Int(3))),
        ]);

        let output = reshaper.reshape_all(&records);
        assert_eq!(output.facts.len(), 1);
        assert_eq!(output.facts[0].period.to_string(), "202502");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].row, Some(0));
        assert!(matches!(
            output.diagnostics[0].issue,
            Issue::Row(RowError::UndefinedPeriod { .. })
        ));
    }

    #[test]
    fn unknown_org_unit_skips_row_with_kind_and_code() {
        let config = config(by_column());
        let resolver = resolver();
        let reshaper = FactReshaper::new(&config, &resolver).unwrap();
        let records = SourceRecordSet::from_rows(vec![
            row("Jan")
                .with("Facility", Some(Cell::from("Nowhere")))
                .with("TX_TB", Some(Cell::Int(2))),
        ]);

        let events: Vec<ReshapeEvent> = reshaper.reshape(&records).collect();
        assert_eq!(events.len(), 1);
        let ReshapeEvent::Skipped(diag) = &events[0] else {
            panic!("expected a skipped row");
        };
        assert_eq!(diag.identity.as_deref(), Some("Nowhere"));
        assert_eq!(
            diag.issue,
            Issue::Row(RowError::UnknownDimensionCode {
                kind: DimensionKind::OrgUnit,
                code: "Nowhere".to_string(),
            })
        );
    }

    #[test]
    fn empty_category_uses_fallback_or_skips() {
        let resolver = resolver();
        let records = SourceRecordSet::from_rows(vec![
            row("Jan")
                .with("AHD_eligible_category", None)
                .with("TX_TB", Some(Cell::Int(2))),
        ]);

        let strict = config(by_column());
        let output = FactReshaper::new(&strict, &resolver)
            .unwrap()
            .reshape_all(&records);
        assert!(matches!(
            output.diagnostics[0].issue,
            Issue::Row(RowError::MissingDimension {
                kind: DimensionKind::CategoryOptionCombo,
                ..
            })
        ));

        let lenient = config(CategorySource::Column {
            column: "AHD_eligible_category".to_string(),
            fallback: Some("vNVfhS2oGT2".to_string()),
        });
        let output = FactReshaper::new(&lenient, &resolver)
            .unwrap()
            .reshape_all(&records);
        assert_eq!(output.facts[0].category_combo_id, "vNVfhS2oGT2");
    }

    #[test]
    fn reshape_is_restartable_over_the_same_input() {
        let config = config(CategorySource::Fixed("kUkskhxydV5".to_string()));
        let resolver = resolver();
        let reshaper = FactReshaper::new(&config, &resolver).unwrap();
        let records = SourceRecordSet::from_rows(vec![
            row("Mar")
                .with("TX_TB", Some(Cell::Int(1)))
                .with("TX_KS", Some(Cell::Int(5))),
        ]);

        let first: ReshapeOutput = reshaper.reshape(&records).collect();
        let second: ReshapeOutput = reshaper.reshape(&records).collect();
        assert_eq!(first, second);
        assert_eq!(first.facts.len(), 2);
    }
}

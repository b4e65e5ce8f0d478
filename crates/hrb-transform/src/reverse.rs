//! Long data values back into wide reporting rows.

use std::collections::HashMap;

use tracing::info;

use hrb_model::{
    Cell, DataValue, Diagnostic, DimensionKind, DimensionResolver, Period, Row, RowError,
    SourceRecordSet,
};

use crate::error::Result;

/// Leading columns of a reconstructed reporting row.
pub const PIVOT_ID_COLUMNS: [&str; 7] = [
    "Id",
    "Facility",
    "Category",
    "Reporting_year",
    "Reporting_Quarter",
    "Reporting_month",
    "period",
];

/// Columns a long data value extract must carry.
pub const DATA_VALUE_COLUMNS: [&str; 5] = [
    "dataElement",
    "period",
    "orgUnit",
    "categoryOptionCombo",
    "value",
];

/// Wide rows plus the long rows that could not be placed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotOutput {
    pub records: SourceRecordSet,
    pub diagnostics: Vec<Diagnostic>,
}

/// Read data values from a long extract, then pivot them.
///
/// Rows with a missing field, a period that is not `YYYYMM` with a real
/// month, or a value that is not a non-negative integer are skipped.
pub fn pivot_records(records: &SourceRecordSet, resolver: &DimensionResolver) -> Result<PivotOutput> {
    records.require_columns(&DATA_VALUE_COLUMNS)?;

    let mut values = Vec::with_capacity(records.len());
    let mut diagnostics = Vec::new();
    for (idx, row) in records.iter().enumerate() {
        match data_value_from_row(row) {
            Ok(value) => values.push(value),
            Err(err) => {
                let identity = row.get("orgUnit").map(ToString::to_string);
                diagnostics.push(Diagnostic::row(idx, identity, err));
            }
        }
    }

    let records = pivot_data_values(&values, resolver);
    Ok(PivotOutput {
        records,
        diagnostics,
    })
}

fn data_value_from_row(row: &Row) -> std::result::Result<DataValue, RowError> {
    let text = |column: &str| {
        row.get(column)
            .map(ToString::to_string)
            .ok_or_else(|| RowError::MissingField {
                column: column.to_string(),
            })
    };

    let raw_period = text("period")?;
    let period: Period = raw_period.parse().map_err(|_| RowError::InvalidField {
        column: "period".to_string(),
        value: raw_period.clone(),
    })?;
    let raw_value = text("value")?;
    let value = row
        .get("value")
        .and_then(Cell::exact_integer)
        .and_then(|value| u64::try_from(value).ok())
        .ok_or_else(|| RowError::InvalidFactValue {
            column: "value".to_string(),
            value: raw_value,
        })?;

    Ok(DataValue {
        data_element: text("dataElement")?,
        period,
        org_unit: text("orgUnit")?,
        category_option_combo: text("categoryOptionCombo")?,
        attribute_option_combo: row
            .get("attributeOptionCombo")
            .map(ToString::to_string)
            .unwrap_or_default(),
        value,
    })
}

/// Group values by org unit, category and period into one wide row each.
///
/// Identifiers are mapped back to their codes when the resolver knows them
/// and kept as-is otherwise. Rows and element columns follow first-seen order.
pub fn pivot_data_values(values: &[DataValue], resolver: &DimensionResolver) -> SourceRecordSet {
    let mut columns: Vec<String> = PIVOT_ID_COLUMNS.iter().map(ToString::to_string).collect();
    let mut rows: Vec<Row> = Vec::new();
    let mut index: HashMap<(&str, &str, Period), usize> = HashMap::new();

    for value in values {
        let key = (
            value.org_unit.as_str(),
            value.category_option_combo.as_str(),
            value.period,
        );
        let slot = *index.entry(key).or_insert_with(|| {
            rows.push(wide_row(rows.len() + 1, value, resolver));
            rows.len() - 1
        });

        let element = resolver
            .code_for(DimensionKind::DataElement, &value.data_element)
            .unwrap_or(value.data_element.as_str())
            .to_string();
        if !columns.contains(&element) {
            columns.push(element.clone());
        }
        let cell = i64::try_from(value.value).map_or_else(
            |_| Cell::Text(value.value.to_string()),
            Cell::Int,
        );
        rows[slot].set(element, Some(cell));
    }

    info!(values = values.len(), rows = rows.len(), "pivoted data values");
    SourceRecordSet::new(columns, rows)
}

fn wide_row(id: usize, value: &DataValue, resolver: &DimensionResolver) -> Row {
    let facility = resolver
        .code_for(DimensionKind::OrgUnit, &value.org_unit)
        .unwrap_or(value.org_unit.as_str());
    let category = resolver
        .code_for(DimensionKind::CategoryOptionCombo, &value.category_option_combo)
        .unwrap_or(value.category_option_combo.as_str());
    let period = value.period;
    Row::new()
        .with("Id", Some(Cell::Int(id as i64)))
        .with("Facility", Cell::text(facility))
        .with("Category", Cell::text(category))
        .with("Reporting_year", Some(Cell::Int(i64::from(period.year()))))
        .with("Reporting_Quarter", Some(Cell::Text(period.quarter())))
        .with("Reporting_month", Some(Cell::from(period.month_name())))
        .with("period", Some(Cell::Text(period.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrb_model::{DimensionTable, Issue};

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
                    DimensionKind::DataElement,
                    [
                        ("CD4<200", "zrbmZYhP2gO".to_string()),
                        ("CD4 >= 200", "YvFoTQA3IPM".to_string()),
                    ],
                )
                .unwrap(),
            )
    }

    fn long_row(element: &str, period: Cell, value: Cell) -> Row {
        Row::new()
            .with("dataElement", Some(Cell::from(element)))
            .with("period", Some(period))
            .with("orgUnit", Some(Cell::from("RY0I8Ha0azq")))
            .with("categoryOptionCombo", Some(Cell::from("kUkskhxydV5")))
            .with("attributeOptionCombo", Some(Cell::from("HllvX50cXC0")))
            .with("value", Some(value))
    }

    #[test]
    fn groups_elements_of_one_facility_month() {
        let records = SourceRecordSet::from_rows(vec![
            long_row("zrbmZYhP2gO", Cell::Int(202501), Cell::Int(4)),
            long_row("YvFoTQA3IPM", Cell::from("202501"), Cell::Int(6)),
            long_row("zrbmZYhP2gO", Cell::Int(202502), Cell::Int(1)),
        ]);

        let output = pivot_records(&records, &resolver()).unwrap();
        assert!(output.diagnostics.is_empty());
        let wide = output.records;
        assert_eq!(wide.len(), 2);
        assert_eq!(&wide.columns()[7..], ["CD4<200", "CD4 >= 200"]);

        let january = &wide.rows()[0];
        assert_eq!(january.get("Facility"), Some(&Cell::from("KCH_OPD1")));
        assert_eq!(january.get("Category"), Some(&Cell::from("kUkskhxydV5")));
        assert_eq!(january.get("Reporting_month"), Some(&Cell::from("January")));
        assert_eq!(january.get("Reporting_Quarter"), Some(&Cell::from("Quarter1")));
        assert_eq!(january.get("CD4<200"), Some(&Cell::Int(4)));
        assert_eq!(january.get("CD4 >= 200"), Some(&Cell::Int(6)));

        let february = &wide.rows()[1];
        assert_eq!(february.get("Id"), Some(&Cell::Int(2)));
        assert_eq!(february.get("CD4 >= 200"), None);
    }

    #[test]
    fn invalid_periods_are_skipped_with_a_diagnostic() {
        let records = SourceRecordSet::from_rows(vec![
            long_row("zrbmZYhP2gO", Cell::Int(202513), Cell::Int(4)),
            long_row("zrbmZYhP2gO", Cell::Int(202501), Cell::Float(1.5)),
        ]);

        let output = pivot_records(&records, &resolver()).unwrap();
        assert!(output.records.is_empty());
        assert_eq!(output.diagnostics.len(), 2);
        assert!(matches!(
            output.diagnostics[0].issue,
            Issue::Row(RowError::InvalidField { ref column, .. }) if column == "period"
        ));
        assert!(matches!(
            output.diagnostics[1].issue,
            Issue::Row(RowError::InvalidFactValue { .. })
        ));
    }

    #[test]
    fn missing_required_column_is_structural() {
        let records =
            SourceRecordSet::from_rows(vec![Row::new().with("period", Some(Cell::Int(202501)))]);
        assert!(pivot_records(&records, &resolver()).is_err());
    }
}

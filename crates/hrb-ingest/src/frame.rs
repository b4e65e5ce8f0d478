//! Polars frame to source record set conversion.

use polars::prelude::*;

use hrb_model::{Cell, Row, SourceRecordSet};

/// Converts a Polars `AnyValue` to a cell.
///
/// Nulls and blank strings become `None`; NaN floats stay present.
pub fn any_to_cell(value: AnyValue<'_>) -> Option<Cell> {
    match value {
        AnyValue::Null => None,
        AnyValue::Boolean(b) => Some(Cell::Bool(b)),
        AnyValue::Int8(v) => Some(Cell::Int(i64::from(v))),
        AnyValue::Int16(v) => Some(Cell::Int(i64::from(v))),
        AnyValue::Int32(v) => Some(Cell::Int(i64::from(v))),
        AnyValue::Int64(v) => Some(Cell::Int(v)),
        AnyValue::UInt8(v) => Some(Cell::Int(i64::from(v))),
        AnyValue::UInt16(v) => Some(Cell::Int(i64::from(v))),
        AnyValue::UInt32(v) => Some(Cell::Int(i64::from(v))),
        AnyValue::UInt64(v) => Some(
            i64::try_from(v).map_or_else(|_| Cell::Float(v as f64), Cell::Int),
        ),
        AnyValue::Float32(v) => Some(Cell::Float(f64::from(v))),
        AnyValue::Float64(v) => Some(Cell::Float(v)),
        AnyValue::String(s) => Cell::text(s),
        AnyValue::StringOwned(s) => Cell::text(s.as_str()),
        other => Cell::text(other.to_string()),
    }
}

/// Builds a record set from every row of a frame, keeping column order.
pub fn frame_to_records(df: &DataFrame) -> SourceRecordSet {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut row = Row::new();
        for column in df.get_columns() {
            let value = column.get(idx).unwrap_or(AnyValue::Null);
            row.set(column.name().to_string(), any_to_cell(value));
        }
        rows.push(row);
    }

    SourceRecordSet::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_to_cell() {
        assert_eq!(any_to_cell(AnyValue::Null), None);
        assert_eq!(any_to_cell(AnyValue::Int32(42)), Some(Cell::Int(42)));
        assert_eq!(any_to_cell(AnyValue::String("  ")), None);
        assert_eq!(any_to_cell(AnyValue::String("Jan")), Some(Cell::Text("Jan".into())));
        assert!(matches!(
            any_to_cell(AnyValue::Float64(f64::NAN)),
            Some(Cell::Float(v)) if v.is_nan()
        ));
    }

    #[test]
    fn test_frame_to_records() {
        let df = df! {
            "Facility" => ["KCH_OPD1", "Area_18"],
            "CD4<200" => [Some(4i64), None],
        }
        .unwrap();

        let records = frame_to_records(&df);
        assert_eq!(records.columns(), ["Facility".to_string(), "CD4<200".to_string()]);
        assert_eq!(records.rows()[0].get("CD4<200"), Some(&Cell::Int(4)));
        assert_eq!(records.rows()[1].get("CD4<200"), None);
        assert!(records.rows()[1].has_column("CD4<200"));
    }
}

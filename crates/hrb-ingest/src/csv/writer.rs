//! CSV output for long-format data values and wide record sets.

use std::path::Path;

use tracing::info;

use hrb_model::{DataValue, SourceRecordSet};

use crate::error::{IngestError, Result};

const DATA_VALUE_HEADER: [&str; 6] = [
    "dataElement",
    "period",
    "orgUnit",
    "categoryOptionCombo",
    "attributeOptionCombo",
    "value",
];

/// Writes data values with the aggregate API's field names as the header.
pub fn write_data_values(path: &Path, values: &[DataValue]) -> Result<()> {
    let wrap = |source: csv::Error| IngestError::CsvWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(wrap)?;
    writer.write_record(DATA_VALUE_HEADER).map_err(wrap)?;
    for value in values {
        writer
            .write_record([
                value.data_element.as_str(),
                &value.period.to_string(),
                value.org_unit.as_str(),
                value.category_option_combo.as_str(),
                value.attribute_option_combo.as_str(),
                &value.value.to_string(),
            ])
            .map_err(wrap)?;
    }
    writer.flush().map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(path = %path.display(), rows = values.len(), "wrote data values");
    Ok(())
}

/// Writes a record set; absent cells are written as empty fields.
pub fn write_record_set(path: &Path, records: &SourceRecordSet) -> Result<()> {
    let wrap = |source: csv::Error| IngestError::CsvWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(wrap)?;
    writer.write_record(records.columns()).map_err(wrap)?;
    for row in records {
        let fields: Vec<String> = records
            .columns()
            .iter()
            .map(|column| row.get(column).map(ToString::to_string).unwrap_or_default())
            .collect();
        writer.write_record(&fields).map_err(wrap)?;
    }
    writer.flush().map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(path = %path.display(), rows = records.len(), "wrote record set");
    Ok(())
}

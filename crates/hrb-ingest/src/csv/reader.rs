//! CSV reading into a Polars frame and then into a source record set.

use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info};

use hrb_model::SourceRecordSet;

use super::header::normalize_column_name;
use crate::error::{IngestError, Result};
use crate::frame::frame_to_records;

/// Maximum file size for CSV loading (500 MB default).
pub const MAX_CSV_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Check file size before loading.
pub fn check_file_size(path: &Path) -> Result<()> {
    check_file_size_with_limit(path, MAX_CSV_FILE_SIZE)
}

/// Check file size against a custom limit.
pub fn check_file_size_with_limit(path: &Path, max_size: u64) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    if metadata.len() == 0 {
        return Err(IngestError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }

    if metadata.len() > max_size {
        return Err(IngestError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size,
        });
    }

    Ok(())
}

/// Reads a CSV file into a Polars DataFrame with normalized column names.
///
/// Column types are inferred from the whole file so that a late text value
/// in a numeric column does not abort the read.
pub fn read_csv_frame(path: &Path) -> Result<DataFrame> {
    check_file_size(path)?;

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut normalized: Vec<String> = Vec::with_capacity(df.width());
    for name in df.get_column_names() {
        let column = normalize_column_name(name);
        if column.is_empty() {
            return Err(IngestError::EmptyColumnName {
                path: path.to_path_buf(),
            });
        }
        if normalized.contains(&column) {
            return Err(IngestError::DuplicateColumn {
                path: path.to_path_buf(),
                column,
            });
        }
        normalized.push(column);
    }
    df.set_column_names(normalized.iter().map(String::as_str))?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "read CSV frame"
    );
    Ok(df)
}

/// Reads a CSV file into a source record set.
pub fn read_csv_records(path: &Path) -> Result<SourceRecordSet> {
    let df = read_csv_frame(path)?;
    let records = frame_to_records(&df);
    info!(path = %path.display(), rows = records.len(), "loaded source records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrb_model::Cell;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_read_csv_frame_normalizes_headers() {
        let file = create_temp_csv("Facility, Reporting month ,CD4<200\nKCH_OPD1,Jan,4\n");
        let df = read_csv_frame(file.path()).unwrap();

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["Facility", "Reporting_month", "CD4<200"]);
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_read_csv_records_types_and_nulls() {
        let file = create_temp_csv("Facility,Reporting_year,CD4_tests\nKCH_OPD1,2025,10\nArea_18,2025,\n");
        let records = read_csv_records(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        let first = &records.rows()[0];
        assert_eq!(first.get("Facility"), Some(&Cell::Text("KCH_OPD1".into())));
        assert_eq!(first.get("Reporting_year").and_then(Cell::exact_integer), Some(2025));
        assert_eq!(first.get("CD4_tests").and_then(Cell::exact_integer), Some(10));
        assert_eq!(records.rows()[1].get("CD4_tests"), None);
    }

    #[test]
    fn test_duplicate_columns_after_normalization() {
        let file = create_temp_csv("Reporting month,Reporting_month\nJan,Feb\n");
        let result = read_csv_frame(file.path());

        assert!(matches!(result, Err(IngestError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_missing_and_empty_files() {
        let result = read_csv_frame(Path::new("/nonexistent/ahd.csv"));
        assert!(matches!(result, Err(IngestError::FileNotFound { .. })));

        let file = create_temp_csv("");
        let result = read_csv_frame(file.path());
        assert!(matches!(result, Err(IngestError::EmptyCsv { .. })));
    }
}

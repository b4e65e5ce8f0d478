//! Source extraction for health record pipelines.
//!
//! CSV files are read through Polars with schema inference over the whole
//! file, column names are normalized, and the frame is converted into a
//! [`SourceRecordSet`](hrb_model::SourceRecordSet). Output helpers write
//! long data values and wide record sets back to CSV.

pub mod csv;
pub mod error;
pub mod frame;

pub use self::csv::{
    MAX_CSV_FILE_SIZE, check_file_size, normalize_column_name, read_csv_frame, read_csv_records,
    write_data_values, write_record_set,
};
pub use error::{IngestError, Result};
pub use frame::{any_to_cell, frame_to_records};

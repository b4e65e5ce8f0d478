//! CSV extraction and output.

mod header;
mod reader;
mod writer;

pub use header::normalize_column_name;
pub use reader::{MAX_CSV_FILE_SIZE, check_file_size, read_csv_frame, read_csv_records};
pub use writer::{write_data_values, write_record_set};

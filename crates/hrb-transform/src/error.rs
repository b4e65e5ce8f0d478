use thiserror::Error;

use hrb_model::ModelError;

/// Configuration and structural errors raised before or around reshaping.
///
/// Row-scoped problems never surface here; they become diagnostics.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("element column '{column}' has no data element mapping")]
    UnmappedElement { column: String },

    #[error("no element columns configured")]
    NoElementColumns,

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, TransformError>;

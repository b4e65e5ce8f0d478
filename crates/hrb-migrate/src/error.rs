use thiserror::Error;

use hrb_load::{LoadError, StoreError};
use hrb_model::{ModelError, SourceKey};

/// Structural migration errors. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A dependent table referenced an identity that was never allocated.
    #[error("source key {key} has no allocated destination id")]
    UnmappedSourceKey { key: SourceKey },

    /// Two source records share a natural key, so identities would collide.
    #[error("source key {key} appears more than once")]
    DuplicateSourceKey { key: SourceKey },

    #[error("cannot allocate {count} ids above watermark {watermark}")]
    AllocationOverflow { watermark: i64, count: usize },

    #[error("failed to read watermark of {table}.{column}: {source}")]
    Watermark {
        table: String,
        column: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, MigrateError>;

//! Error types for table loading and remote submission.

use thiserror::Error;

/// Failures reported by a destination store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A row broke a NOT NULL or unique constraint.
    #[error("constraint violated in {table}: {message}")]
    Constraint { table: String, message: String },

    /// The table is not part of the destination schema.
    #[error("table '{0}' does not exist in the destination")]
    UnknownTable(String),

    /// The blocking runtime for the database driver could not start.
    #[error("failed to start database runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// A source column whose type has no cell representation.
    #[error("column '{column}' has unsupported type {type_name}")]
    UnsupportedColumn { column: String, type_name: String },

    #[cfg(feature = "mysql")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Structural load errors. Each one aborts the load of its table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsafe identifier '{name}': only letters, digits and '_' are allowed")]
    UnsafeIdentifier { name: String },

    #[error("column '{column}' is not part of destination table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("failed to persist table '{table}': {source}")]
    PersistenceFailure {
        table: String,
        #[source]
        source: StoreError,
    },
}

/// Transport faults talking to the aggregate API.
///
/// A non-success response is not an error; see `SubmissionOutcome`.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

pub type Result<T> = std::result::Result<T, LoadError>;

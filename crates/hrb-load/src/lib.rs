//! Persistence of derived tables and submission of aggregate payloads.
//!
//! Local destinations raise on failure and roll the table back; the remote
//! aggregate API reports rejections as an outcome instead, because the
//! server may already have applied part of the batch.
//!
//! - **identifier / statement**: validated identifiers and parameterized inserts
//! - **destination / memory**: the store trait and an in-memory store
//! - **loader**: per-table, all-or-nothing loading
//! - **remote**: the aggregate API client
//! - **mysql** (feature `mysql`): live MySQL destination and source

pub mod destination;
pub mod error;
pub mod identifier;
pub mod loader;
pub mod memory;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod remote;
pub mod statement;

pub use destination::{ColumnDef, Destination, TableSchema};
pub use error::{LoadError, RemoteError, Result, StoreError};
pub use identifier::Identifier;
pub use loader::{load, load_in_order};
pub use memory::MemoryDestination;
#[cfg(feature = "mysql")]
pub use mysql::{MySqlDestination, MySqlSource};
pub use remote::{AggregateClient, DEFAULT_TIMEOUT, SubmissionOutcome, classify_response};
pub use statement::InsertStatement;

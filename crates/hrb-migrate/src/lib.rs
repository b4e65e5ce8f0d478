//! Migration of source records into a destination with its own key space.
//!
//! - **records**: typed source records parsed from extracted rows
//! - **allocator**: surrogate ids above the destination watermark, plus row tokens
//! - **builder**: projections and melts over records and their allocated ids
//! - **prison**: the prison health records mapping
//! - **run**: watermark, allocation, building and loading in one pass

pub mod allocator;
pub mod builder;
pub mod error;
pub mod prison;
pub mod records;
pub mod run;

pub use allocator::{IdentityAllocator, IdentityMap, allocate, new_token};
pub use builder::{BuildOutput, ColumnSource, Melt, NpidFormat, Projection};
pub use error::{MigrateError, Result};
pub use prison::{
    ART_HISTORY_QUERY, MigrationPlan, MigrationSettings, PERSON_ID_COLUMN, PERSON_TABLE,
    PRISONERS_QUERY, build_prison_tables,
};
pub use records::{ArtHistoryRecord, FromRow, PrisonerRecord, SourceRecord, parse_records};
pub use run::{PrisonSource, read_watermark, run_migration};

//! Shared data model for health record reshaping and migration.
//!
//! - **cell / row**: typed scalar cells and the source record set
//! - **lookup**: immutable code-to-identifier tables (dimension resolution)
//! - **period / fact**: monthly periods, long-format facts and the aggregate payload
//! - **value**: destination values and derived tables
//! - **diagnostic / report**: skipped-input records and per-run summaries

pub mod cell;
pub mod diagnostic;
pub mod error;
pub mod fact;
pub mod ids;
pub mod lookup;
pub mod period;
pub mod report;
pub mod row;
pub mod value;

pub use cell::Cell;
pub use diagnostic::{Diagnostic, Issue, RowError, Scope};
pub use error::{ModelError, Result};
pub use fact::{DataValue, DataValueSet, Fact};
pub use ids::{DestinationId, GlobalToken, SourceKey};
pub use lookup::{DimensionKind, DimensionResolver, DimensionTable};
pub use period::{Period, month_from_name};
pub use report::{RunReport, WriteSummary};
pub use row::{Row, SourceRecordSet};
pub use value::{DestinationTable, Value};

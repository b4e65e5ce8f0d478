//! Reshaping of wide reporting forms into aggregate facts.
//!
//! - **derive**: per-row arithmetic run before reshaping
//! - **reshape**: the fact reshaper, one fact per present element value
//! - **policy**: count validation between facts and the aggregate payload
//! - **reverse**: long data values back into wide reporting rows

pub mod derive;
pub mod error;
pub mod policy;
pub mod reshape;
pub mod reverse;

pub use derive::{DerivedColumn, apply_derived};
pub use error::{Result, TransformError};
pub use policy::{PolicyOutput, ValuePolicy};
pub use reshape::{CategorySource, FactReshaper, ReshapeConfig, ReshapeEvent, ReshapeOutput};
pub use reverse::{DATA_VALUE_COLUMNS, PIVOT_ID_COLUMNS, PivotOutput, pivot_data_values, pivot_records};

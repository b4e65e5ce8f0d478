//! Library components of the `health-bridge` binary.

pub mod config;
pub mod logging;

//! Per-run outcome reported to the user.

use serde::Serialize;

use crate::diagnostic::Diagnostic;

/// Rows written to one destination table or endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub target: String,
    pub rows: u64,
    /// Set when the target reported a failure; `rows` is then what was confirmed.
    pub failure: Option<String>,
}

/// Counts per target plus every skipped-input diagnostic.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub writes: Vec<WriteSummary>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_write(&mut self, target: impl Into<String>, rows: u64) {
        self.writes.push(WriteSummary {
            target: target.into(),
            rows,
            failure: None,
        });
    }

    pub fn record_failure(&mut self, target: impl Into<String>, message: impl Into<String>) {
        self.writes.push(WriteSummary {
            target: target.into(),
            rows: 0,
            failure: Some(message.into()),
        });
    }

    pub fn extend_diagnostics(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn total_rows(&self) -> u64 {
        self.writes.iter().map(|write| write.rows).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.writes.iter().any(|write| write.failure.is_some())
    }

    pub fn rows_for(&self, target: &str) -> u64 {
        self.writes
            .iter()
            .filter(|write| write.target == target)
            .map(|write| write.rows)
            .sum()
    }
}

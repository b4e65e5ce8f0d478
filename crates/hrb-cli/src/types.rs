use std::fmt::Display;

use hrb_load::SubmissionOutcome;
use hrb_model::RunReport;

#[derive(Debug)]
pub struct CommandResult {
    pub command: &'static str,
    pub report: RunReport,
    /// Aggregate server response, when a payload was posted.
    pub outcome: Option<SubmissionOutcome>,
    /// Structural error that stopped the run after it started writing.
    pub error: Option<String>,
}

impl CommandResult {
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            report: RunReport::new(),
            outcome: None,
            error: None,
        }
    }

    /// Keep a run error next to the partial report instead of dropping both.
    pub fn capture<E: Display>(&mut self, outcome: Result<(), E>) {
        if let Err(err) = outcome {
            self.error = Some(err.to_string());
        }
    }

    pub fn has_errors(&self) -> bool {
        self.error.is_some()
            || self.report.has_failures()
            || self
                .outcome
                .as_ref()
                .is_some_and(|outcome| !outcome.is_accepted())
    }
}

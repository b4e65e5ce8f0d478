//! Aggregate-data API submission.

use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::{debug, info, warn};

use hrb_model::DataValueSet;

use crate::error::RemoteError;

/// Path of the aggregate values endpoint below the server base URL.
pub const DATA_VALUE_SETS_PATH: &str = "/api/dataValueSets";

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What the server said about a submitted payload.
///
/// A rejection is reported, not raised: the server may have applied part
/// of the batch, so the caller decides whether the run continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted { status: u16, body: String },
    Rejected { status: u16, body: String },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Accepted { status, .. } | Self::Rejected { status, .. } => *status,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Accepted { body, .. } | Self::Rejected { body, .. } => body,
        }
    }
}

/// Classify a response by status code; any 2xx is an acceptance.
pub fn classify_response(status: u16, body: String) -> SubmissionOutcome {
    if (200..300).contains(&status) {
        SubmissionOutcome::Accepted { status, body }
    } else {
        SubmissionOutcome::Rejected { status, body }
    }
}

/// Blocking client for one aggregate-data server.
pub struct AggregateClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl fmt::Debug for AggregateClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl AggregateClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
        })
    }

    /// Full URL of the aggregate values endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{DATA_VALUE_SETS_PATH}", self.base_url.trim_end_matches('/'))
    }

    /// Post the whole payload once. Transport faults are errors; any
    /// response, successful or not, is an outcome carrying the full body.
    pub fn submit(&self, payload: &DataValueSet) -> Result<SubmissionOutcome, RemoteError> {
        let url = self.endpoint();
        debug!(url = %url, values = payload.len(), "posting data values");

        let transport = |source| RemoteError::Transport {
            url: url.clone(),
            source,
        };
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(USER_AGENT, format!("health-bridge/{}", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .map_err(transport)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(transport)?;
        let outcome = classify_response(status, body);
        if outcome.is_accepted() {
            info!(status, values = payload.len(), "aggregate submission accepted");
        } else {
            warn!(status, "aggregate submission rejected");
        }
        Ok(outcome)
    }
}

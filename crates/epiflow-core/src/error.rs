use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical result for every epiflow crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Problem-detail body returned by the aggregate endpoint on failure.
///
/// Fields are carried verbatim; `type` is renamed because it is a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetail {
    pub status: u16,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Conditions raised while building or evaluating a pipeline.
///
/// Operators never wrap a child's error: whatever a leaf raises reaches the
/// caller as-is. `EmptyRange` is the one condition handled inside the pipeline
/// (FillMissing swallows it).
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("evaluation cancelled")]
    Cancelled,

    #[error("fetch failed{}: {message}", fmt_status(.status))]
    FetchFailed {
        status: Option<u16>,
        problem: Option<ProblemDetail>,
        message: String,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no non-null keys to compute a range from")]
    EmptyRange,

    #[error("{op} transform failed: {message}")]
    TransformFailed { op: &'static str, message: String },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Planning error: {0}")]
    Plan(String),
}

impl Error {
    /// Cancellation means "no result yet", not a failure worth showing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    pub fn transform(op: &'static str, message: impl Into<String>) -> Self {
        Error::TransformFailed {
            op,
            message: message.into(),
        }
    }

    /// The problem detail sent by the endpoint, if this is a fetch failure that carried one.
    pub fn problem(&self) -> Option<&ProblemDetail> {
        match self {
            Error::FetchFailed { problem, .. } => problem.as_ref(),
            _ => None,
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidResponse(e.to_string())
    }
}

//! Error types for request validation, transport and orchestration

use std::time::Duration;
use thiserror::Error;

/// A raw job parameter failed validation before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A single request/response exchange with the backend failed
///
/// Errors carry messages rather than the underlying `reqwest` error so they
/// can be cloned into job snapshots and observer events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The backend could not be reached (DNS, refused connection, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status code
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// The response body was missing expected fields or was not JSON
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    pub fn is_network(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Malformed(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Malformed(err.to_string())
    }
}

/// Why a job ended in `Failed`, or why a completed job has no result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestrationFailure {
    #[error("submission error: {0}")]
    Submission(TransportError),

    #[error("status-check error: {0}")]
    StatusCheck(TransportError),

    /// The backend reported a terminal status other than `completed`
    #[error("backend reported status '{status}'{}", message_suffix(.message))]
    Backend {
        status: String,
        message: Option<String>,
    },

    #[error("no terminal status after {polls} status checks")]
    PollLimitExceeded { polls: u32 },

    #[error("no terminal status within {deadline:?}")]
    DeadlineExceeded { deadline: Duration },

    /// The job completed but its result could not be retrieved
    #[error("result retrieval error: {0}")]
    ResultFetch(TransportError),
}

impl OrchestrationFailure {
    /// Short machine-friendly label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestrationFailure::Submission(_) => "submission",
            OrchestrationFailure::StatusCheck(_) => "status_check",
            OrchestrationFailure::Backend { .. } => "backend",
            OrchestrationFailure::PollLimitExceeded { .. } => "poll_limit",
            OrchestrationFailure::DeadlineExceeded { .. } => "deadline",
            OrchestrationFailure::ResultFetch(_) => "result_fetch",
        }
    }
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(": {}", m),
        _ => String::new(),
    }
}

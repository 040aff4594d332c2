//! Error types for remote compute access.

use thiserror::Error;

/// Errors that can occur talking to the token or compute endpoints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RemoteError {
    /// Missing or malformed credentials or endpoint settings. Not retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The token or compute endpoint rejected our identity. Not retried.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network failure or temporary upstream unavailability.
    #[error("Transient error: {0}")]
    Transient(String),

    /// The remote job reported a computation failure.
    #[error("Remote computation failed (code {code}): {message}")]
    RemoteCompute {
        /// Upstream error code.
        code: i64,
        /// Upstream error message.
        message: String,
    },

    /// The job did not finish within the polling budget.
    #[error("Remote job did not complete after {attempts} status checks")]
    Timeout {
        /// Number of status checks performed.
        attempts: u32,
    },

    /// Polling was cancelled by the caller.
    #[error("Remote job polling was cancelled")]
    Cancelled,

    /// The upstream answered with something we could not interpret.
    #[error("Invalid response from remote service: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Whether a higher layer may reasonably retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Transient(_) | RemoteError::Timeout { .. })
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transient(err.to_string())
    }
}

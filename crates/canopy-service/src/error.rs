//! Error types for the calculation service.

use canopy_engine::EstimationError;
use canopy_geo::GeometryError;
use canopy_remote::RemoteError;
use canopy_signal::SignalError;
use thiserror::Error;

/// Uniform failure of a calculation request.
///
/// Every variant maps to a short machine-readable [`code`](Self::code) and
/// an HTTP-like [`status`](Self::status).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalculationError {
    /// Malformed geometry, area, dates or signal values. Not retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or malformed credentials or settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Credential rejected upstream.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network or upstream hiccup; safe to retry later.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The remote computation failed or returned an unusable result.
    #[error("Remote computation failed: {0}")]
    RemoteCompute(String),

    /// The remote job did not finish within the polling budget.
    #[error("Timed out: {0}")]
    Timeout(String),
}

impl CalculationError {
    /// Short machine-readable error string.
    pub fn code(&self) -> &'static str {
        match self {
            CalculationError::InvalidInput(_) => "invalid_input",
            CalculationError::Configuration(_) => "configuration_error",
            CalculationError::Authentication(_) => "authentication_error",
            CalculationError::Transient(_) => "transient_error",
            CalculationError::RemoteCompute(_) => "remote_compute_error",
            CalculationError::Timeout(_) => "timeout",
        }
    }

    /// HTTP-like status code for the failure response.
    pub fn status(&self) -> u16 {
        match self {
            CalculationError::InvalidInput(_) => 400,
            CalculationError::Configuration(_) => 500,
            CalculationError::Authentication(_) => 502,
            CalculationError::Transient(_) => 503,
            CalculationError::RemoteCompute(_) => 502,
            CalculationError::Timeout(_) => 504,
        }
    }

    /// Whether a caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CalculationError::Transient(_) | CalculationError::Timeout(_))
    }
}

impl From<GeometryError> for CalculationError {
    fn from(err: GeometryError) -> Self {
        CalculationError::InvalidInput(err.to_string())
    }
}

impl From<EstimationError> for CalculationError {
    fn from(err: EstimationError) -> Self {
        match err {
            EstimationError::InvalidParameter { .. } => CalculationError::Configuration(err.to_string()),
            _ => CalculationError::InvalidInput(err.to_string()),
        }
    }
}

impl From<RemoteError> for CalculationError {
    fn from(err: RemoteError) -> Self {
        let message = err.to_string();
        match err {
            RemoteError::Configuration(_) => CalculationError::Configuration(message),
            RemoteError::Authentication(_) => CalculationError::Authentication(message),
            RemoteError::Transient(_) | RemoteError::Cancelled => CalculationError::Transient(message),
            RemoteError::RemoteCompute { .. } | RemoteError::InvalidResponse(_) => {
                CalculationError::RemoteCompute(message)
            }
            RemoteError::Timeout { .. } => CalculationError::Timeout(message),
        }
    }
}

impl From<SignalError> for CalculationError {
    fn from(err: SignalError) -> Self {
        match err {
            SignalError::Remote(remote) => remote.into(),
            SignalError::InvalidDateRange { .. } => CalculationError::InvalidInput(err.to_string()),
            SignalError::MalformedResult(_) | SignalError::NoLandCover => {
                CalculationError::RemoteCompute(err.to_string())
            }
        }
    }
}

/// Failure to persist an audit record.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or appending the backing file failed.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

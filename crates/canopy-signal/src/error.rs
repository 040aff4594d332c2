//! Error types for vegetation signal sources.

use canopy_remote::RemoteError;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while producing a vegetation signal.
///
/// The simulated source never fails; these come from the live source and
/// from request validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignalError {
    /// Token exchange or job polling failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The remote job finished but its result lacks an expected statistic.
    #[error("Malformed compute result: {0}")]
    MalformedResult(String),

    /// The land-cover histogram for the parcel was empty.
    #[error("No land-cover pixels found inside the parcel")]
    NoLandCover,

    /// The requested observation window ends before it starts.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Window start.
        start: NaiveDate,
        /// Window end.
        end: NaiveDate,
    },
}

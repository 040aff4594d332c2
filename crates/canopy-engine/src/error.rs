//! Error types for the estimation engine.

use thiserror::Error;

/// Malformed inputs and parameters rejected by the estimation engine.
///
/// Every variant except [`EstimationError::InvalidParameter`] is a caller
/// error; the engine performs no I/O.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimationError {
    /// Area is negative.
    #[error("Area must be non-negative, got {0} ha")]
    NegativeArea(f64),

    /// Area is NaN or infinite.
    #[error("Area must be a finite number")]
    NonFiniteArea,

    /// The land-cover breakdown has no categories.
    #[error("Land-cover breakdown is empty")]
    EmptyLandCover,

    /// A land-cover percentage is negative or non-finite.
    #[error("Invalid percentage {value} for land-cover category '{label}'")]
    InvalidPercentage {
        /// Category label as supplied.
        label: String,
        /// Offending percentage.
        value: f64,
    },

    /// Mean vegetation index outside [-1, 1].
    #[error("Mean vegetation index {0} is outside [-1, 1]")]
    IndexOutOfRange(f64),

    /// Index standard deviation is negative or non-finite.
    #[error("Vegetation index standard deviation must be finite and >= 0, got {0}")]
    InvalidStdDev(f64),

    /// Cloud coverage outside [0, 100].
    #[error("Cloud coverage {0}% is outside [0, 100]")]
    CloudCoverageOutOfRange(f64),

    /// An estimation parameter is unusable.
    #[error("Invalid estimation parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter (or parameter group) name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

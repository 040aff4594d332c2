//! # canopy-signal
//!
//! Vegetation signal sources for the carbon estimation engine.
//!
//! A signal is the mean and spread of a vegetation index over a parcel, a
//! land-cover mix in percent, and the cloud contamination of the underlying
//! observations. Two sources implement [`VegetationSignalEstimator`]:
//!
//! - [`SimulatedSignal`]: deterministic, offline, never fails. Values are
//!   biased by latitude band and growing season.
//! - [`LiveSignal`]: evaluates an expression graph on a remote compute API
//!   through `canopy-remote`, and can fail with the remote error taxonomy.
//!
//! ## Example
//!
//! ```
//! use canopy_geo::{Coordinate, Polygon};
//! use canopy_signal::{SimulatedSignal, VegetationSignalEstimator};
//!
//! let parcel = Polygon::new(vec![
//!     Coordinate::new(-1.0, 52.0),
//!     Coordinate::new(-0.99, 52.0),
//!     Coordinate::new(-0.99, 52.01),
//! ])?;
//! let signal = SimulatedSignal::new().estimate_signal(&parcel, None)?;
//! assert!((signal.land_cover_total() - 100.0).abs() < 1e-6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod estimator;
pub mod land_cover;
mod live;
mod simulated;

pub use error::SignalError;
pub use estimator::{DateRange, VegetationSignalEstimator};
pub use live::{
    build_expression, parse_result, LiveSignal, LiveSignalConfig, DEFAULT_API_BASE, LAND_COVER_BAND, LIVE_METHOD,
};
pub use simulated::{LatitudeBand, SimulatedSignal, SIMULATED_METHOD};

/// Result type for signal operations.
pub type Result<T> = std::result::Result<T, SignalError>;

//! # canopy-engine
//!
//! Carbon storage estimation for a parcel from vegetation index statistics
//! and a land-cover breakdown.
//!
//! ## Pipeline
//!
//! 1. Each land-cover category maps to a per-hectare coefficient triple
//!    (above-ground biomass carbon, soil organic carbon, root-to-shoot ratio).
//! 2. Above-ground biomass is scaled by the mean vegetation index relative to
//!    a reference value, clamped to a sane multiplier range.
//! 3. Cloud coverage selects a confidence multiplier for biomass and soil.
//! 4. Per-category contributions are summed over the parcel area.
//! 5. High spatial variability of the index dampens all pools.
//! 6. Carbon mass converts to CO2-equivalent with [`CO2_PER_CARBON`].
//! 7. A [`DataQuality`] grade and uncertainty range are attached.
//!
//! The engine is a pure function of its inputs: no I/O and no randomness.
//!
//! ## Example
//!
//! ```
//! use canopy_engine::{CarbonEstimationEngine, DataQuality, VegetationSignal};
//!
//! let engine = CarbonEstimationEngine::default();
//! let signal = VegetationSignal::new(0.6, 0.1, 5.0)
//!     .with_cover("Forest", 100.0);
//! let estimate = engine.estimate(&signal, 1.0)?;
//! assert_eq!(estimate.data_quality, DataQuality::High);
//! assert!(estimate.total_co2e > 0.0);
//! # Ok::<(), canopy_engine::EstimationError>(())
//! ```

mod coefficients;
mod error;
mod estimate;
mod params;
mod signal;

pub use coefficients::{normalize_category, CarbonCoefficients, CoefficientTable};
pub use error::EstimationError;
pub use estimate::{
    round2, CarbonEstimate, CarbonEstimationEngine, DataQuality, UncertaintyRange,
    CO2_PER_CARBON, ENGINE_METHOD,
};
pub use params::EstimationParams;
pub use signal::VegetationSignal;

/// Result type for estimation operations.
pub type Result<T> = std::result::Result<T, EstimationError>;

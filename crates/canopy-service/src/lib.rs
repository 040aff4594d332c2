//! # canopy-service
//!
//! The carbon calculation service: turns a drawn parcel into a carbon
//! estimate.
//!
//! A request carries a GeoJSON polygon and optionally a caller-supplied area
//! and an observation window. [`CalculationService`] validates the geometry,
//! computes the area when it is absent, obtains a vegetation signal from the
//! configured source (simulated or live), runs the estimation engine and
//! hands the result to an optional [`EstimateStore`].
//!
//! Failures from every layer are folded into [`CalculationError`], whose
//! `code()` is the short string placed in the failure envelope.
//!
//! ## Example
//!
//! ```
//! use canopy_engine::CarbonEstimationEngine;
//! use canopy_service::CalculationService;
//! use canopy_signal::SimulatedSignal;
//!
//! let service = CalculationService::new(Box::new(SimulatedSignal::new()), CarbonEstimationEngine::default());
//! let response = service.handle_json(
//!     r#"{"geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [0.01, 0.0], [0.01, 0.01], [0.0, 0.01]]]}}"#,
//! );
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body["calculation"]["calculation_method"], "simulated_ndvi_v1");
//! ```

pub mod config;
mod error;
mod request;
mod service;
pub mod store;

pub use config::{ServiceConfig, SignalConfig, SignalMode, StoreConfig};
pub use error::{CalculationError, StoreError};
pub use request::{CalculationOutcome, CalculationRequest, ServiceResponse};
pub use service::{CalculationService, DEFAULT_WINDOW_DAYS};
pub use store::{CarbonRecord, EstimateStore, JsonLinesStore, MemoryStore, StoredRecord};

//! Calculation orchestration.

use crate::config::{ServiceConfig, SignalMode};
use crate::store::{CarbonRecord, EstimateStore, JsonLinesStore};
use crate::{CalculationError, CalculationOutcome, CalculationRequest, ServiceResponse};
use canopy_engine::CarbonEstimationEngine;
use canopy_metrics::{metric_defs, metrics, CalculationLabels};
use canopy_signal::{LiveSignal, SimulatedSignal, VegetationSignalEstimator};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default observation window when a request names only an end date.
pub const DEFAULT_WINDOW_DAYS: u64 = 90;

/// Validates a parcel, obtains its vegetation signal, runs the engine and
/// optionally persists an audit record.
///
/// Holds no per-request state; concurrent calls are independent.
pub struct CalculationService {
    estimator: Box<dyn VegetationSignalEstimator>,
    engine: CarbonEstimationEngine,
    store: Option<Arc<dyn EstimateStore>>,
    window_days: u64,
}

impl CalculationService {
    pub fn new(estimator: Box<dyn VegetationSignalEstimator>, engine: CarbonEstimationEngine) -> Self {
        Self {
            estimator,
            engine,
            store: None,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    /// Persist every successful estimate to `store`.
    pub fn with_store(mut self, store: Arc<dyn EstimateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Window length used when a request names only an end date.
    pub fn with_window_days(mut self, days: u64) -> Self {
        self.window_days = days;
        self
    }

    /// Build the service described by `config`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, CalculationError> {
        config.validate()?;
        let estimator: Box<dyn VegetationSignalEstimator> = match config.signal.mode {
            SignalMode::Simulated => Box::new(SimulatedSignal::new()),
            SignalMode::Live => Box::new(LiveSignal::from_config(config.signal.live.clone())?),
        };
        info!(method = estimator.method(), "calculation service configured");

        let mut service = Self::new(estimator, CarbonEstimationEngine::new(config.estimation_params()))
            .with_window_days(config.signal.live.default_window_days);
        if let Some(path) = &config.store.jsonl_path {
            service = service.with_store(Arc::new(JsonLinesStore::new(path.clone())));
        }
        Ok(service)
    }

    /// Method tag of the configured signal source.
    pub fn method(&self) -> &'static str {
        self.estimator.method()
    }

    /// The engine in use.
    pub fn engine(&self) -> &CarbonEstimationEngine {
        &self.engine
    }

    /// Run one calculation.
    ///
    /// Input is fully validated before the signal source is consulted, so
    /// malformed requests never reach the network.
    pub fn calculate(&self, request: &CalculationRequest) -> Result<CalculationOutcome, CalculationError> {
        let polygon = request.polygon()?;
        let area_hectares = match request.checked_area()? {
            Some(area) => area,
            None => polygon.area_hectares(),
        };
        let range = request.date_range(self.window_days)?;
        debug!(area_hectares, vertices = polygon.exterior().distinct_vertex_count(), "calculation input accepted");

        let signal = self.estimator.estimate_signal(&polygon, range.as_ref())?;
        let estimate = self
            .engine
            .estimate(&signal, area_hectares)?
            .with_method(self.estimator.method());

        let labels = CalculationLabels::new(self.estimator.method(), estimate.data_quality.as_str());
        metrics::counter!(metric_defs::CALCULATION_REQUESTS.name, &labels.to_labels()).increment(1);
        metrics::histogram!(metric_defs::CALCULATION_TOTAL_CO2E.name, &labels.to_labels()).record(estimate.total_co2e);
        metrics::histogram!(metric_defs::CALCULATION_AREA.name).record(area_hectares);

        info!(
            method = %estimate.calculation_method,
            quality = %estimate.data_quality,
            total_co2e = estimate.total_co2e,
            area_hectares,
            "carbon estimate computed"
        );

        let outcome = CalculationOutcome {
            estimate,
            area_hectares,
            signal,
            method: self.estimator.method().to_string(),
            polygon,
        };
        self.persist(&outcome);
        Ok(outcome)
    }

    /// Store failures are logged and counted; they never fail the calculation.
    fn persist(&self, outcome: &CalculationOutcome) {
        let Some(store) = &self.store else {
            return;
        };
        match store.insert(CarbonRecord::from_outcome(outcome, Utc::now())) {
            Ok(id) => {
                debug!(%id, "estimate stored");
                metrics::counter!(metric_defs::STORE_WRITES.name, "outcome" => "ok").increment(1);
            }
            Err(e) => {
                warn!(error = %e, "failed to store estimate");
                metrics::counter!(metric_defs::STORE_WRITES.name, "outcome" => "error").increment(1);
            }
        }
    }

    /// Handle a JSON request body and produce the response envelope.
    pub fn handle_json(&self, body: &str) -> ServiceResponse {
        let result = CalculationRequest::from_json(body).and_then(|request| self.calculate(&request));
        match result {
            Ok(outcome) => ServiceResponse::success(&outcome),
            Err(e) => {
                error!(code = e.code(), status = e.status(), error = %e, "calculation failed");
                metrics::counter!(metric_defs::CALCULATION_FAILURES.name, "error" => e.code()).increment(1);
                ServiceResponse::failure(&e)
            }
        }
    }
}

//! Metrics for the carbon estimation pipeline.
//!
//! This crate declares every metric the pipeline emits as a structured
//! [`Metric`] constant, so names and label keys are not retyped at call sites.
//! It re-exports the `metrics` crate for convenience. No recorder is installed
//! here; without one the `metrics` macros are no-ops.
//!
//! # Example
//!
//! ```rust
//! use canopy_metrics::{metric_defs, CalculationLabels};
//!
//! let labels = CalculationLabels::new("simulated_ndvi_v1", "high");
//! metrics::counter!(metric_defs::CALCULATION_REQUESTS.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_histogram, Unit};

/// The kind of metric (counter or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use canopy_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const JOBS: Metric = Metric::counter("canopy.example.jobs")
///     .with_description("Jobs seen")
///     .with_unit(Unit::Count)
///     .with_labels(&["outcome"]);
///
/// assert_eq!(JOBS.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "canopy.remote.poll_attempts").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new counter metric.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Creates a new histogram metric.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    /// Sets the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(self.name, unit, self.description),
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Histogram, Some(unit)) => describe_histogram!(self.name, unit, self.description),
            (MetricKind::Histogram, None) => describe_histogram!(self.name, self.description),
        }
    }
}

/// All metric definitions for the pipeline.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Calculation
    // ========================================================================

    /// Calculation requests that produced an estimate.
    ///
    /// Labels: method, quality
    pub const CALCULATION_REQUESTS: Metric = Metric::counter("canopy.calculation.requests")
        .with_description("Calculation requests that produced an estimate")
        .with_unit(Unit::Count)
        .with_labels(&["method", "quality"]);

    /// Calculation requests that failed.
    ///
    /// Labels: error
    pub const CALCULATION_FAILURES: Metric = Metric::counter("canopy.calculation.failures")
        .with_description("Calculation requests that failed")
        .with_unit(Unit::Count)
        .with_labels(&["error"]);

    /// Estimated total CO2e per calculation, in tonnes.
    ///
    /// Labels: method, quality
    pub const CALCULATION_TOTAL_CO2E: Metric = Metric::histogram("canopy.calculation.total_co2e_t")
        .with_description("Estimated total CO2e per calculation in tonnes")
        .with_labels(&["method", "quality"]);

    /// Parcel area per calculation, in hectares.
    pub const CALCULATION_AREA: Metric = Metric::histogram("canopy.calculation.area_ha")
        .with_description("Parcel area per calculation in hectares");

    // ========================================================================
    // Remote compute
    // ========================================================================

    /// Token exchanges attempted.
    ///
    /// Labels: outcome
    pub const REMOTE_TOKEN_EXCHANGES: Metric = Metric::counter("canopy.remote.token_exchanges")
        .with_description("Service-account token exchanges attempted")
        .with_unit(Unit::Count)
        .with_labels(&["outcome"]);

    /// Job status checks performed.
    pub const REMOTE_POLL_ATTEMPTS: Metric = Metric::counter("canopy.remote.poll_attempts")
        .with_description("Remote job status checks performed")
        .with_unit(Unit::Count);

    /// Remote jobs by final outcome.
    ///
    /// Labels: outcome (immediate, completed, failed, timeout, cancelled)
    pub const REMOTE_JOBS: Metric = Metric::counter("canopy.remote.jobs")
        .with_description("Remote compute jobs by outcome")
        .with_unit(Unit::Count)
        .with_labels(&["outcome"]);

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Audit record writes.
    ///
    /// Labels: outcome
    pub const STORE_WRITES: Metric = Metric::counter("canopy.store.writes")
        .with_description("Estimate audit record writes")
        .with_unit(Unit::Count)
        .with_labels(&["outcome"]);

    /// Every metric, for bulk description.
    pub const ALL: &[Metric] = &[
        CALCULATION_REQUESTS,
        CALCULATION_FAILURES,
        CALCULATION_TOTAL_CO2E,
        CALCULATION_AREA,
        REMOTE_TOKEN_EXCHANGES,
        REMOTE_POLL_ATTEMPTS,
        REMOTE_JOBS,
        STORE_WRITES,
    ];
}

/// Labels attached to per-calculation metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationLabels {
    /// Calculation method tag (which signal source ran).
    pub method: String,
    /// Data-quality grade.
    pub quality: String,
}

impl CalculationLabels {
    /// Create labels for one calculation.
    pub fn new(method: impl Into<String>, quality: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            quality: quality.into(),
        }
    }

    /// Labels as key-value pairs for the `metrics` macros.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("method", self.method.clone()), ("quality", self.quality.clone())]
    }
}

/// Describes all metrics. Call once at startup after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

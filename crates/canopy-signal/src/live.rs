//! Live vegetation signal from a remote geospatial compute API.
//!
//! One calculation performs one token exchange and one compute job. The job
//! evaluates a serialized expression graph that
//!
//! 1. filters the optical collection to the parcel and observation window,
//! 2. takes the per-pixel median and derives an NDVI band,
//! 3. reduces NDVI over the parcel with a combined mean and standard deviation,
//! 4. computes a frequency histogram of the land-cover product over the parcel,
//! 5. averages the scene-level cloudy-pixel percentage of the filtered scenes.
//!
//! The job result is a dictionary with `ndvi`, `land_cover` and
//! `cloud_percent` entries, parsed by [`parse_result`].

use crate::land_cover::histogram_to_percentages;
use crate::{DateRange, Result, SignalError, VegetationSignalEstimator};
use canopy_engine::VegetationSignal;
use canopy_geo::Polygon;
use canopy_remote::{
    HttpTransport, JobPoller, PollPolicy, RemoteError, ReqwestTransport, ServiceAccountCredential, TokenExchanger,
    DEFAULT_SCOPE,
};
use chrono::{Days, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Method tag for estimates built from the live signal.
pub const LIVE_METHOD: &str = "live_ndvi_v1";

/// Base URL of the compute API.
pub const DEFAULT_API_BASE: &str = "https://earthengine.googleapis.com/v1";

/// Band holding class codes in the land-cover product.
pub const LAND_COVER_BAND: &str = "Map";

const NDVI_BAND: &str = "ndvi";
const NIR_BAND: &str = "B8_median";
const RED_BAND: &str = "B4_median";
const CLOUD_PROPERTY: &str = "CLOUDY_PIXEL_PERCENTAGE";
const REDUCTION_SCALE_M: f64 = 10.0;
const MAX_PIXELS: f64 = 1e9;

/// Settings for the live signal source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSignalConfig {
    /// Service-account key file.
    pub credentials_path: Option<PathBuf>,
    /// Cloud project id; falls back to the credential's `project_id`.
    pub project: Option<String>,
    /// OAuth scope requested for the bearer token.
    pub scope: String,
    /// Token endpoint override.
    pub token_uri: Option<String>,
    /// Compute endpoint; derived from the project when unset.
    pub compute_url: Option<String>,
    /// Base URL that job names are resolved against.
    pub operations_url: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    pub land_cover_dataset: String,
    pub optical_dataset: String,
    /// Observation window length when the request names none.
    pub default_window_days: u64,
}

impl Default for LiveSignalConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            project: None,
            scope: DEFAULT_SCOPE.to_string(),
            token_uri: None,
            compute_url: None,
            operations_url: DEFAULT_API_BASE.to_string(),
            poll_interval_ms: 2000,
            max_poll_attempts: 30,
            request_timeout_secs: 60,
            land_cover_dataset: "ESA/WorldCover/v200".to_string(),
            optical_dataset: "COPERNICUS/S2_SR_HARMONIZED".to_string(),
            default_window_days: 90,
        }
    }
}

impl LiveSignalConfig {
    /// Polling budget from the configured interval and attempt count.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
        }
    }
}

/// Signal source backed by the remote compute API.
pub struct LiveSignal {
    config: LiveSignalConfig,
    credential: ServiceAccountCredential,
    project: String,
    exchanger: TokenExchanger,
    poller: JobPoller,
}

impl LiveSignal {
    /// Build a live source over `transport`.
    ///
    /// Fails with a configuration error when no project can be determined.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credential: ServiceAccountCredential,
        config: LiveSignalConfig,
    ) -> Result<Self> {
        let project = config
            .project
            .clone()
            .or_else(|| credential.project_id.clone())
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                RemoteError::Configuration("no project configured and the credential names none".to_string())
            })?;

        let compute_url = config
            .compute_url
            .clone()
            .unwrap_or_else(|| format!("{DEFAULT_API_BASE}/projects/{project}/value:compute"));

        let mut exchanger = TokenExchanger::new(transport.clone(), config.scope.clone());
        if let Some(uri) = &config.token_uri {
            exchanger = exchanger.with_token_uri(uri.clone());
        }
        let poller = JobPoller::new(transport, compute_url, config.operations_url.clone(), config.poll_policy());

        Ok(Self {
            config,
            credential,
            project,
            exchanger,
            poller,
        })
    }

    /// Build a live source from configuration, reading the credential file
    /// and creating an HTTP client.
    pub fn from_config(config: LiveSignalConfig) -> Result<Self> {
        let path = config
            .credentials_path
            .clone()
            .ok_or_else(|| RemoteError::Configuration("live signal requires credentials_path".to_string()))?;
        let credential = ServiceAccountCredential::from_file(&path)?;
        let transport = ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Self::new(Arc::new(transport), credential, config)
    }

    /// Abandon polling once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.poller = self.poller.with_cancellation(flag);
        self
    }

    /// The project compute jobs run under.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Window used when the request names none: the configured number of days ending today.
    pub fn default_range(&self) -> DateRange {
        DateRange::ending(Utc::now().date_naive(), self.config.default_window_days)
    }
}

impl VegetationSignalEstimator for LiveSignal {
    fn method(&self) -> &'static str {
        LIVE_METHOD
    }

    fn estimate_signal(&self, polygon: &Polygon, range: Option<&DateRange>) -> Result<VegetationSignal> {
        let range = range.copied().unwrap_or_else(|| self.default_range());
        let token = self.exchanger.get_access_token(&self.credential)?;
        let expression = build_expression(polygon, &range, &self.config);

        info!(project = %self.project, start = %range.start(), end = %range.end(), "requesting live vegetation signal");
        let project_path = format!("projects/{}", self.project);
        let value = self.poller.submit_and_await(&token, &expression, Some(&project_path))?;
        debug!(result = %value, "live signal job finished");

        parse_result(&value)
    }
}

fn call(function: &str, arguments: Value) -> Value {
    json!({ "functionInvocationValue": { "functionName": function, "arguments": arguments } })
}

fn constant(value: Value) -> Value {
    json!({ "constantValue": value })
}

/// Build the serialized expression graph for `polygon` over `range`.
pub fn build_expression(polygon: &Polygon, range: &DateRange, config: &LiveSignalConfig) -> Value {
    let ring: Vec<[f64; 2]> = polygon
        .exterior()
        .coordinates()
        .iter()
        .map(|c| [c.lon, c.lat])
        .collect();
    let region = call(
        "GeometryConstructors.Polygon",
        json!({ "coordinates": constant(json!([ring])), "evenOdd": constant(json!(true)) }),
    );

    // The date filter's end is exclusive.
    let end_exclusive = range.end().checked_add_days(Days::new(1)).unwrap_or(range.end());
    let scenes = call(
        "Collection.filter",
        json!({
            "collection": call(
                "Collection.filter",
                json!({
                    "collection": call("ImageCollection.load", json!({ "id": constant(json!(config.optical_dataset)) })),
                    "filter": call("Filter.intersects", json!({ "leftField": constant(json!(".all")), "rightValue": region })),
                }),
            ),
            "filter": call(
                "Filter.dateRangeContains",
                json!({
                    "leftValue": call("DateRange", json!({
                        "start": constant(json!(range.start().to_string())),
                        "end": constant(json!(end_exclusive.to_string())),
                    })),
                    "rightField": constant(json!("system:time_start")),
                }),
            ),
        }),
    );

    let median = call("ImageCollection.reduce", json!({ "collection": scenes, "reducer": call("Reducer.median", json!({})) }));
    let ndvi = call(
        "Image.rename",
        json!({
            "input": call("Image.normalizedDifference", json!({ "input": median, "bandNames": constant(json!([NIR_BAND, RED_BAND])) })),
            "names": constant(json!([NDVI_BAND])),
        }),
    );
    let ndvi_stats = call(
        "Image.reduceRegion",
        json!({
            "image": ndvi,
            "reducer": call("Reducer.combine", json!({
                "reducer1": call("Reducer.mean", json!({})),
                "reducer2": call("Reducer.stdDev", json!({})),
                "sharedInputs": constant(json!(true)),
            })),
            "geometry": region,
            "scale": constant(json!(REDUCTION_SCALE_M)),
            "maxPixels": constant(json!(MAX_PIXELS)),
        }),
    );

    let land_cover_image = call(
        "Image.select",
        json!({
            "input": call("ImageCollection.mosaic", json!({
                "collection": call("ImageCollection.load", json!({ "id": constant(json!(config.land_cover_dataset)) })),
            })),
            "bandSelectors": constant(json!([LAND_COVER_BAND])),
        }),
    );
    let land_cover = call(
        "Image.reduceRegion",
        json!({
            "image": land_cover_image,
            "reducer": call("Reducer.frequencyHistogram", json!({})),
            "geometry": region,
            "scale": constant(json!(REDUCTION_SCALE_M)),
            "maxPixels": constant(json!(MAX_PIXELS)),
        }),
    );

    let cloud = call(
        "AggregateFeatureCollection.mean",
        json!({ "collection": scenes, "property": constant(json!(CLOUD_PROPERTY)) }),
    );

    json!({
        "result": "0",
        "values": {
            "0": {
                "dictionaryValue": {
                    "values": {
                        "ndvi": ndvi_stats,
                        "land_cover": land_cover,
                        "cloud_percent": cloud,
                    }
                }
            }
        }
    })
}

fn number(value: &Value, pointer: &str, what: &str) -> Result<f64> {
    value
        .pointer(pointer)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .ok_or_else(|| SignalError::MalformedResult(format!("{what} is missing from the job result")))
}

/// Turn a finished job's result into a [`VegetationSignal`].
pub fn parse_result(value: &Value) -> Result<VegetationSignal> {
    let mean = number(value, "/ndvi/ndvi_mean", "NDVI mean")?;
    let std_dev = number(value, "/ndvi/ndvi_stdDev", "NDVI standard deviation")?;
    let cloud = number(value, "/cloud_percent", "cloud percentage (no scenes in the window?)")?;
    if !(-1.0..=1.0).contains(&mean) {
        return Err(SignalError::MalformedResult(format!("NDVI mean {mean} is outside [-1, 1]")));
    }
    if std_dev < 0.0 {
        return Err(SignalError::MalformedResult(format!("NDVI standard deviation {std_dev} is negative")));
    }

    let land_cover = value.get("land_cover");
    let histogram = land_cover
        .and_then(|lc| lc.get(LAND_COVER_BAND))
        .or(land_cover)
        .and_then(Value::as_object)
        .ok_or(SignalError::NoLandCover)?;
    let percentages = histogram_to_percentages(
        histogram
            .iter()
            .filter_map(|(code, count)| count.as_f64().map(|c| (code.as_str(), c))),
    );
    if percentages.is_empty() {
        return Err(SignalError::NoLandCover);
    }

    let mut signal = VegetationSignal::new(
        (mean * 10_000.0).round() / 10_000.0,
        (std_dev * 10_000.0).round() / 10_000.0,
        (cloud.clamp(0.0, 100.0) * 100.0).round() / 100.0,
    );
    signal.land_cover = percentages;
    Ok(signal)
}

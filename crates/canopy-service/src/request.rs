//! Inbound request and outbound response envelopes.

use crate::CalculationError;
use canopy_engine::{round2, CarbonEstimate, VegetationSignal};
use canopy_geo::Polygon;
use canopy_signal::DateRange;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A calculation request as sent by the map client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    /// GeoJSON `Polygon` geometry.
    pub geometry: Value,
    /// Caller-supplied area; computed from the geometry when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_hectares: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl CalculationRequest {
    /// Request for a geometry with no area or dates.
    pub fn for_geometry(geometry: Value) -> Self {
        Self {
            geometry,
            area_hectares: None,
            start_date: None,
            end_date: None,
        }
    }

    /// Parse a JSON request body.
    pub fn from_json(body: &str) -> Result<Self, CalculationError> {
        serde_json::from_str(body).map_err(|e| CalculationError::InvalidInput(format!("malformed request: {e}")))
    }

    /// Validated polygon.
    pub fn polygon(&self) -> Result<Polygon, CalculationError> {
        Ok(Polygon::from_json_value(&self.geometry)?)
    }

    /// The supplied area, if any, checked to be finite and non-negative.
    pub fn checked_area(&self) -> Result<Option<f64>, CalculationError> {
        match self.area_hectares {
            Some(area) if !area.is_finite() => Err(CalculationError::InvalidInput(
                "areaHectares must be a finite number".to_string(),
            )),
            Some(area) if area < 0.0 => Err(CalculationError::InvalidInput(format!(
                "areaHectares must not be negative (got {area})"
            ))),
            other => Ok(other),
        }
    }

    /// Observation window from the optional dates.
    ///
    /// With only an end date the window is `window_days` long; with only a
    /// start date it runs to today. With neither, the signal source decides.
    pub fn date_range(&self, window_days: u64) -> Result<Option<DateRange>, CalculationError> {
        let range = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)?),
            (None, Some(end)) => Some(DateRange::ending(end, window_days)),
            (Some(start), None) => Some(DateRange::new(start, Utc::now().date_naive())?),
            (None, None) => None,
        };
        Ok(range)
    }
}

/// A completed calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationOutcome {
    pub estimate: CarbonEstimate,
    /// Area the estimate was computed for.
    pub area_hectares: f64,
    /// Signal the estimate was computed from.
    pub signal: VegetationSignal,
    /// Method tag of the signal source that ran.
    pub method: String,
    pub polygon: Polygon,
}

impl CalculationOutcome {
    /// Provenance details reported alongside the pools.
    pub fn data_sources(&self) -> Value {
        json!({
            "vegetation_signal": self.method,
            "ndvi_mean": self.signal.mean_index,
            "ndvi_std_dev": self.signal.index_std_dev,
            "cloud_coverage_percent": self.signal.cloud_coverage_percent,
            "land_cover": self.signal.land_cover,
            "data_quality": self.estimate.data_quality,
            "uncertainty_range": self.estimate.uncertainty_range,
            "uncertainty_percent": self.estimate.uncertainty_percent,
            "area_hectares": round2(self.area_hectares),
            "dominant_cover": self.estimate.dominant_cover,
        })
    }

    /// The `calculation` object of the success envelope.
    pub fn calculation(&self) -> Value {
        json!({
            "total_co2e": self.estimate.total_co2e,
            "above_ground_biomass": self.estimate.above_ground_biomass,
            "below_ground_biomass": self.estimate.below_ground_biomass,
            "soil_organic_carbon": self.estimate.soil_organic_carbon,
            "calculation_method": self.estimate.calculation_method,
            "data_sources": self.data_sources(),
        })
    }
}

/// Status code and JSON body returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: Value,
}

impl ServiceResponse {
    /// `{ "success": true, "calculation": ... }` with status 200.
    pub fn success(outcome: &CalculationOutcome) -> Self {
        Self {
            status: 200,
            body: json!({ "success": true, "calculation": outcome.calculation() }),
        }
    }

    /// `{ "success": false, "error": code, "message": ... }` with the error's status.
    pub fn failure(err: &CalculationError) -> Self {
        Self {
            status: err.status(),
            body: json!({ "success": false, "error": err.code(), "message": err.to_string() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

//! The carbon estimation engine.

use crate::{normalize_category, EstimationError, EstimationParams, Result, VegetationSignal};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mass of CO2 per unit mass of carbon (44/12).
pub const CO2_PER_CARBON: f64 = 44.0 / 12.0;

/// Method tag used until a signal source names itself.
pub const ENGINE_METHOD: &str = "allometric_v1";

/// Round to two decimal places for presentation stability.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Confidence grade of an estimate.
///
/// Ordered from best to worst, so `max` picks the worse grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    /// Clear observations and a homogeneous parcel.
    High,
    /// Some cloud interference or heterogeneity.
    Medium,
    /// Heavily cloud-contaminated or very heterogeneous.
    Low,
}

impl DataQuality {
    /// Returns the grade as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataQuality::High => "high",
            DataQuality::Medium => "medium",
            DataQuality::Low => "low",
        }
    }
}

impl std::fmt::Display for DataQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower and upper bound around the total CO2e.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyRange {
    /// Lower bound (tonnes CO2e).
    pub low: f64,
    /// Upper bound (tonnes CO2e).
    pub high: f64,
}

impl UncertaintyRange {
    /// Width of the range.
    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// Pooled carbon estimate for a parcel.
///
/// Pools are tonnes of carbon; `total_co2e` is their sum converted with
/// [`CO2_PER_CARBON`]. All values are rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonEstimate {
    /// Total CO2-equivalent (tonnes).
    pub total_co2e: f64,
    /// Above-ground biomass carbon (tonnes C).
    pub above_ground_biomass: f64,
    /// Below-ground biomass carbon (tonnes C).
    pub below_ground_biomass: f64,
    /// Soil organic carbon (tonnes C).
    pub soil_organic_carbon: f64,
    /// Which estimator variant produced the inputs.
    pub calculation_method: String,
    /// Confidence grade.
    pub data_quality: DataQuality,
    /// Bounds around `total_co2e`.
    pub uncertainty_range: UncertaintyRange,
    /// Half-width of `uncertainty_range` relative to `total_co2e`, as a percentage.
    pub uncertainty_percent: f64,
    /// Land-cover category with the largest share.
    pub dominant_cover: String,
    /// Multiplier applied to above-ground coefficients from the mean index.
    pub index_multiplier: f64,
    /// Confidence multiplier from cloud coverage.
    pub quality_multiplier: f64,
    /// Dampening from index variability.
    pub variability_factor: f64,
}

impl CarbonEstimate {
    /// Replace the method tag, typically with the signal source's name.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.calculation_method = method.into();
        self
    }

    /// Sum of the three carbon pools (tonnes C).
    pub fn carbon_total(&self) -> f64 {
        self.above_ground_biomass + self.below_ground_biomass + self.soil_organic_carbon
    }
}

/// Combines a vegetation signal and an area into a [`CarbonEstimate`].
#[derive(Debug, Clone, Default)]
pub struct CarbonEstimationEngine {
    params: EstimationParams,
}

impl CarbonEstimationEngine {
    /// Create an engine with custom parameters.
    pub fn new(params: EstimationParams) -> Self {
        Self { params }
    }

    /// The parameters in use.
    pub fn params(&self) -> &EstimationParams {
        &self.params
    }

    /// Estimate carbon pools for `area_hectares` described by `signal`.
    ///
    /// Fails only on malformed input: a negative or non-finite area, an empty
    /// land-cover breakdown, or signal fields outside their ranges.
    pub fn estimate(&self, signal: &VegetationSignal, area_hectares: f64) -> Result<CarbonEstimate> {
        if !area_hectares.is_finite() {
            return Err(EstimationError::NonFiniteArea);
        }
        if area_hectares < 0.0 {
            return Err(EstimationError::NegativeArea(area_hectares));
        }
        signal.validate()?;

        let p = &self.params;
        let cloud_grade = p.classify_cloud(signal.cloud_coverage_percent);
        let quality_multiplier = p.quality_multiplier(cloud_grade);
        let index_multiplier = p.index_multiplier(signal.mean_index);
        let variability_factor = p.variability_factor(signal.index_std_dev);

        let mut above = 0.0;
        let mut below = 0.0;
        let mut soil = 0.0;
        for (label, &percent) in &signal.land_cover {
            let (coeffs, known) = p.coefficients.lookup(label);
            if !known {
                debug!("Unknown land-cover category '{}', using fallback coefficients", label);
            }
            let category_area = area_hectares * percent / 100.0;
            let category_above =
                coeffs.above_ground_per_ha * index_multiplier * quality_multiplier * category_area;
            above += category_above;
            below += category_above * coeffs.root_to_shoot;
            soil += coeffs.soil_per_ha * quality_multiplier * category_area;
        }

        let above_ground_biomass = round2(above * variability_factor);
        let below_ground_biomass = round2(below * variability_factor);
        let soil_organic_carbon = round2(soil * variability_factor);
        let total_co2e =
            round2((above_ground_biomass + below_ground_biomass + soil_organic_carbon) * CO2_PER_CARBON);

        let data_quality = p.classify(signal.cloud_coverage_percent, signal.index_std_dev);
        let uncertainty = p.effective_uncertainty(data_quality, quality_multiplier);
        let uncertainty_range = UncertaintyRange {
            low: round2((total_co2e * (1.0 - uncertainty)).max(0.0)),
            high: round2(total_co2e * (1.0 + uncertainty)),
        };

        debug!(
            "Estimated {:.2} t CO2e over {:.2} ha (quality={}, index_mult={:.3}, cloud_mult={:.2}, var={:.3})",
            total_co2e, area_hectares, data_quality, index_multiplier, quality_multiplier, variability_factor
        );

        Ok(CarbonEstimate {
            total_co2e,
            above_ground_biomass,
            below_ground_biomass,
            soil_organic_carbon,
            calculation_method: ENGINE_METHOD.to_string(),
            data_quality,
            uncertainty_range,
            uncertainty_percent: round2(uncertainty * 100.0),
            dominant_cover: dominant_category(signal),
            index_multiplier,
            quality_multiplier,
            variability_factor,
        })
    }
}

/// Canonical label of the category with the largest percentage.
///
/// Ties resolve to the alphabetically first canonical label.
fn dominant_category(signal: &VegetationSignal) -> String {
    let mut best: Option<(String, f64)> = None;
    for (label, &percent) in &signal.land_cover {
        let label = normalize_category(label);
        let better = match &best {
            None => true,
            Some((best_label, best_percent)) => {
                percent > *best_percent || (percent == *best_percent && label < *best_label)
            }
        };
        if better {
            best = Some((label, percent));
        }
    }
    best.map(|(label, _)| label).unwrap_or_default()
}

//! Tunable estimation parameters.

use crate::{CarbonCoefficients, CoefficientTable, DataQuality, EstimationError, Result};
use serde::{Deserialize, Serialize};

/// Configurable constants used by the estimation engine.
///
/// All values are fixed configuration, never derived at runtime. The defaults
/// are the calibrated values; deployments may override any field from the
/// service configuration file.
///
/// # Example
///
/// ```
/// use canopy_engine::{DataQuality, EstimationParams};
///
/// let params = EstimationParams::default();
/// assert_eq!(params.classify_cloud(5.0), DataQuality::High);
/// assert_eq!(params.classify_cloud(50.0), DataQuality::Low);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationParams {
    // Vegetation index scaling
    /// Mean index at which the above-ground coefficient applies unscaled.
    pub reference_index: f64,
    /// Lower clamp for the index multiplier.
    pub index_multiplier_min: f64,
    /// Upper clamp for the index multiplier.
    pub index_multiplier_max: f64,

    // Data quality classification
    /// Cloud coverage strictly below this is High quality (%).
    pub cloud_high_max_percent: f64,
    /// Cloud coverage strictly below this (and not High) is Medium quality (%).
    pub cloud_medium_max_percent: f64,
    /// Index std-dev at or below this is High quality.
    pub std_dev_high_max: f64,
    /// Index std-dev at or below this (and not High) is Medium quality.
    pub std_dev_medium_max: f64,

    // Confidence multipliers applied to biomass and soil
    /// Multiplier for High cloud grade.
    pub quality_multiplier_high: f64,
    /// Multiplier for Medium cloud grade.
    pub quality_multiplier_medium: f64,
    /// Multiplier for Low cloud grade.
    pub quality_multiplier_low: f64,

    // Variability dampening
    /// Std-dev at which the variability factor is exactly 1.0.
    pub reference_std_dev: f64,
    /// Factor drop per unit of std-dev above the reference.
    pub variability_sensitivity: f64,
    /// Lowest allowed variability factor.
    pub variability_floor: f64,

    // Uncertainty fractions per grade
    /// Uncertainty fraction for High quality.
    pub uncertainty_high: f64,
    /// Uncertainty fraction for Medium quality.
    pub uncertainty_medium: f64,
    /// Uncertainty fraction for Low quality.
    pub uncertainty_low: f64,

    /// Per-category carbon coefficients.
    pub coefficients: CoefficientTable,
}

impl Default for EstimationParams {
    fn default() -> Self {
        Self {
            reference_index: 0.6,
            index_multiplier_min: 0.2,
            index_multiplier_max: 2.0,

            cloud_high_max_percent: 10.0,
            cloud_medium_max_percent: 30.0,
            std_dev_high_max: 0.15,
            std_dev_medium_max: 0.25,

            quality_multiplier_high: 1.0,
            quality_multiplier_medium: 0.9,
            quality_multiplier_low: 0.75,

            reference_std_dev: 0.1,
            variability_sensitivity: 1.0,
            variability_floor: 0.7,

            uncertainty_high: 0.10,
            uncertainty_medium: 0.20,
            uncertainty_low: 0.35,

            coefficients: CoefficientTable::default(),
        }
    }
}

impl EstimationParams {
    /// Grade observations by cloud coverage.
    pub fn classify_cloud(&self, cloud_coverage_percent: f64) -> DataQuality {
        if cloud_coverage_percent < self.cloud_high_max_percent {
            DataQuality::High
        } else if cloud_coverage_percent < self.cloud_medium_max_percent {
            DataQuality::Medium
        } else {
            DataQuality::Low
        }
    }

    /// Grade observations by spatial variability of the index.
    pub fn classify_variability(&self, index_std_dev: f64) -> DataQuality {
        if index_std_dev <= self.std_dev_high_max {
            DataQuality::High
        } else if index_std_dev <= self.std_dev_medium_max {
            DataQuality::Medium
        } else {
            DataQuality::Low
        }
    }

    /// Overall grade: the worse of the cloud and variability grades.
    pub fn classify(&self, cloud_coverage_percent: f64, index_std_dev: f64) -> DataQuality {
        self.classify_cloud(cloud_coverage_percent)
            .max(self.classify_variability(index_std_dev))
    }

    /// Confidence multiplier for a cloud grade.
    pub fn quality_multiplier(&self, grade: DataQuality) -> f64 {
        match grade {
            DataQuality::High => self.quality_multiplier_high,
            DataQuality::Medium => self.quality_multiplier_medium,
            DataQuality::Low => self.quality_multiplier_low,
        }
    }

    /// Uncertainty fraction for an overall grade.
    pub fn uncertainty_fraction(&self, grade: DataQuality) -> f64 {
        match grade {
            DataQuality::High => self.uncertainty_high,
            DataQuality::Medium => self.uncertainty_medium,
            DataQuality::Low => self.uncertainty_low,
        }
    }

    /// Uncertainty fraction around a cloud-adjusted total.
    ///
    /// The half-width is the grade fraction of the unadjusted total plus the
    /// share removed by `quality_multiplier`, expressed relative to the
    /// adjusted total. Every cloud downgrade therefore widens the range even
    /// when variability already fixes the grade.
    pub fn effective_uncertainty(&self, grade: DataQuality, quality_multiplier: f64) -> f64 {
        (self.uncertainty_fraction(grade) + 1.0 - quality_multiplier) / quality_multiplier
    }

    /// Check that the parameters are usable by the engine.
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, reason: impl Into<String>) -> Result<()> {
            Err(EstimationError::InvalidParameter {
                name,
                reason: reason.into(),
            })
        }

        let finite = [
            ("reference_index", self.reference_index),
            ("index_multiplier_min", self.index_multiplier_min),
            ("index_multiplier_max", self.index_multiplier_max),
            ("cloud_high_max_percent", self.cloud_high_max_percent),
            ("cloud_medium_max_percent", self.cloud_medium_max_percent),
            ("std_dev_high_max", self.std_dev_high_max),
            ("std_dev_medium_max", self.std_dev_medium_max),
            ("quality_multiplier_high", self.quality_multiplier_high),
            ("quality_multiplier_medium", self.quality_multiplier_medium),
            ("quality_multiplier_low", self.quality_multiplier_low),
            ("reference_std_dev", self.reference_std_dev),
            ("variability_sensitivity", self.variability_sensitivity),
            ("variability_floor", self.variability_floor),
            ("uncertainty_high", self.uncertainty_high),
            ("uncertainty_medium", self.uncertainty_medium),
            ("uncertainty_low", self.uncertainty_low),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return invalid(name, format!("must be finite, got {value}"));
            }
        }

        if self.reference_index <= 0.0 {
            return invalid("reference_index", format!("must be > 0, got {}", self.reference_index));
        }
        if self.index_multiplier_min < 0.0 || self.index_multiplier_min > self.index_multiplier_max {
            return invalid(
                "index_multiplier_min",
                format!(
                    "need 0 <= min <= max, got min {} and max {}",
                    self.index_multiplier_min, self.index_multiplier_max
                ),
            );
        }
        if self.cloud_high_max_percent < 0.0 || self.cloud_high_max_percent > self.cloud_medium_max_percent {
            return invalid(
                "cloud_high_max_percent",
                format!(
                    "need 0 <= high <= medium, got {} and {}",
                    self.cloud_high_max_percent, self.cloud_medium_max_percent
                ),
            );
        }
        if self.std_dev_high_max < 0.0 || self.std_dev_high_max > self.std_dev_medium_max {
            return invalid(
                "std_dev_high_max",
                format!(
                    "need 0 <= high <= medium, got {} and {}",
                    self.std_dev_high_max, self.std_dev_medium_max
                ),
            );
        }

        let multipliers = [
            self.quality_multiplier_high,
            self.quality_multiplier_medium,
            self.quality_multiplier_low,
        ];
        if multipliers.iter().any(|&m| m <= 0.0 || m > 1.0) {
            return invalid("quality_multiplier", "each multiplier must lie in (0, 1]");
        }
        if !(multipliers[0] >= multipliers[1] && multipliers[1] >= multipliers[2]) {
            return invalid("quality_multiplier", "multipliers must not increase from high to low");
        }

        let fractions = [self.uncertainty_high, self.uncertainty_medium, self.uncertainty_low];
        if fractions.iter().any(|&u| !(0.0..=1.0).contains(&u)) {
            return invalid("uncertainty", "each fraction must lie in [0, 1]");
        }
        if !(fractions[0] <= fractions[1] && fractions[1] <= fractions[2]) {
            return invalid("uncertainty", "fractions must not decrease from high to low");
        }

        if self.reference_std_dev < 0.0 || self.variability_sensitivity < 0.0 {
            return invalid("variability", "reference std-dev and sensitivity must be >= 0");
        }
        if self.variability_floor <= 0.0 || self.variability_floor > 1.0 {
            return invalid(
                "variability_floor",
                format!("must lie in (0, 1], got {}", self.variability_floor),
            );
        }

        let coefficients = self
            .coefficients
            .categories
            .iter()
            .map(|(label, c)| (label.as_str(), c))
            .chain(std::iter::once(("fallback", &self.coefficients.fallback)));
        for (label, c) in coefficients {
            if !valid_coefficients(c) {
                return invalid(
                    "coefficients",
                    format!("'{label}' must have finite, non-negative values, got {c:?}"),
                );
            }
        }
        Ok(())
    }

    /// Above-ground biomass multiplier for a mean index.
    ///
    /// Linear in the index relative to `reference_index`, clamped to
    /// `[index_multiplier_min, index_multiplier_max]`. Non-decreasing.
    pub fn index_multiplier(&self, mean_index: f64) -> f64 {
        (mean_index / self.reference_index)
            .max(self.index_multiplier_min)
            .min(self.index_multiplier_max)
    }

    /// Dampening factor for spatial heterogeneity.
    ///
    /// 1.0 at or below `reference_std_dev`, then decreasing linearly down to
    /// `variability_floor`.
    pub fn variability_factor(&self, index_std_dev: f64) -> f64 {
        let excess = (index_std_dev - self.reference_std_dev).max(0.0);
        (1.0 - self.variability_sensitivity * excess).max(self.variability_floor)
    }
}

fn valid_coefficients(c: &CarbonCoefficients) -> bool {
    [c.above_ground_per_ha, c.soil_per_ha, c.root_to_shoot]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_params() {
        let params = EstimationParams::default();
        assert_eq!(params.reference_index, 0.6);
        assert_eq!(params.index_multiplier_min, 0.2);
        assert_eq!(params.index_multiplier_max, 2.0);
        assert_eq!(params.cloud_high_max_percent, 10.0);
        assert_eq!(params.cloud_medium_max_percent, 30.0);
        assert_eq!(params.uncertainty_high, 0.10);
        assert_eq!(params.uncertainty_medium, 0.20);
        assert_eq!(params.uncertainty_low, 0.35);
    }

    #[test]
    fn test_classify_cloud() {
        let params = EstimationParams::default();
        assert_eq!(params.classify_cloud(0.0), DataQuality::High);
        assert_eq!(params.classify_cloud(9.99), DataQuality::High);
        assert_eq!(params.classify_cloud(10.0), DataQuality::Medium);
        assert_eq!(params.classify_cloud(29.9), DataQuality::Medium);
        assert_eq!(params.classify_cloud(30.0), DataQuality::Low);
        assert_eq!(params.classify_cloud(100.0), DataQuality::Low);
    }

    #[test]
    fn test_classify_takes_worse_grade() {
        let params = EstimationParams::default();
        assert_eq!(params.classify(5.0, 0.1), DataQuality::High);
        assert_eq!(params.classify(5.0, 0.2), DataQuality::Medium);
        assert_eq!(params.classify(5.0, 0.4), DataQuality::Low);
        assert_eq!(params.classify(20.0, 0.05), DataQuality::Medium);
        assert_eq!(params.classify(50.0, 0.2), DataQuality::Low);
    }

    #[test]
    fn test_index_multiplier_clamps() {
        let params = EstimationParams::default();
        assert_relative_eq!(params.index_multiplier(0.6), 1.0, epsilon = 1e-12);
        assert_relative_eq!(params.index_multiplier(0.3), 0.5, epsilon = 1e-12);
        assert_relative_eq!(params.index_multiplier(0.0), 0.2, epsilon = 1e-12);
        assert_relative_eq!(params.index_multiplier(-0.5), 0.2, epsilon = 1e-12);
        assert_relative_eq!(params.index_multiplier(1.0), 1.0 / 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_index_multiplier_ceiling() {
        let params = EstimationParams {
            reference_index: 0.4,
            ..Default::default()
        };
        assert_relative_eq!(params.index_multiplier(0.8), 2.0, epsilon = 1e-12);
        assert_relative_eq!(params.index_multiplier(1.0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_variability_factor() {
        let params = EstimationParams::default();
        assert_relative_eq!(params.variability_factor(0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(params.variability_factor(0.1), 1.0, epsilon = 1e-12);
        assert_relative_eq!(params.variability_factor(0.2), 0.9, epsilon = 1e-12);
        assert_relative_eq!(params.variability_factor(0.3), 0.8, epsilon = 1e-12);
        assert_relative_eq!(params.variability_factor(5.0), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_default_params_are_valid() {
        assert_eq!(EstimationParams::default().validate(), Ok(()));
    }

    fn rejected(params: EstimationParams) -> &'static str {
        match params.validate() {
            Err(EstimationError::InvalidParameter { name, .. }) => name,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_index_scaling() {
        let base = EstimationParams::default;
        assert_eq!(rejected(EstimationParams { reference_index: 0.0, ..base() }), "reference_index");
        assert_eq!(rejected(EstimationParams { reference_index: -0.3, ..base() }), "reference_index");
        assert_eq!(
            rejected(EstimationParams { index_multiplier_min: 3.0, ..base() }),
            "index_multiplier_min"
        );
        assert_eq!(
            rejected(EstimationParams { index_multiplier_min: -0.1, ..base() }),
            "index_multiplier_min"
        );
        assert_eq!(
            rejected(EstimationParams { index_multiplier_max: f64::NAN, ..base() }),
            "index_multiplier_max"
        );
    }

    #[test]
    fn test_validate_rejects_unordered_thresholds() {
        let base = EstimationParams::default;
        assert_eq!(
            rejected(EstimationParams { cloud_high_max_percent: 40.0, ..base() }),
            "cloud_high_max_percent"
        );
        assert_eq!(
            rejected(EstimationParams { cloud_high_max_percent: -1.0, ..base() }),
            "cloud_high_max_percent"
        );
        assert_eq!(rejected(EstimationParams { std_dev_high_max: 0.3, ..base() }), "std_dev_high_max");
    }

    #[test]
    fn test_validate_rejects_bad_multipliers_and_fractions() {
        let base = EstimationParams::default;
        assert_eq!(
            rejected(EstimationParams { quality_multiplier_low: 0.0, ..base() }),
            "quality_multiplier"
        );
        assert_eq!(
            rejected(EstimationParams { quality_multiplier_medium: 1.5, ..base() }),
            "quality_multiplier"
        );
        assert_eq!(
            rejected(EstimationParams { quality_multiplier_low: 0.95, ..base() }),
            "quality_multiplier"
        );
        assert_eq!(rejected(EstimationParams { uncertainty_low: 1.2, ..base() }), "uncertainty");
        assert_eq!(rejected(EstimationParams { uncertainty_high: -0.1, ..base() }), "uncertainty");
        assert_eq!(rejected(EstimationParams { uncertainty_medium: 0.05, ..base() }), "uncertainty");
        assert_eq!(rejected(EstimationParams { variability_floor: 0.0, ..base() }), "variability_floor");
        assert_eq!(rejected(EstimationParams { variability_sensitivity: -1.0, ..base() }), "variability");
    }

    #[test]
    fn test_validate_rejects_negative_coefficients() {
        let mut params = EstimationParams::default();
        params
            .coefficients
            .categories
            .insert("Forest".to_string(), CarbonCoefficients::new(-5.0, 90.0, 0.24));
        assert_eq!(rejected(params), "coefficients");

        let mut params = EstimationParams::default();
        params.coefficients.fallback = CarbonCoefficients::new(10.0, f64::INFINITY, 0.25);
        assert_eq!(rejected(params), "coefficients");
    }

    #[test]
    fn test_effective_uncertainty() {
        let params = EstimationParams::default();
        assert_relative_eq!(params.effective_uncertainty(DataQuality::High, 1.0), 0.10, epsilon = 1e-12);
        assert_relative_eq!(params.effective_uncertainty(DataQuality::Medium, 1.0), 0.20, epsilon = 1e-12);
        assert_relative_eq!(params.effective_uncertainty(DataQuality::Medium, 0.9), 0.3 / 0.9, epsilon = 1e-12);
        assert_relative_eq!(params.effective_uncertainty(DataQuality::Low, 0.75), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_partial_yaml_override() {
        let params: EstimationParams =
            serde_yaml::from_str("cloud_high_max_percent: 15.0\nuncertainty_low: 0.5\n").unwrap();
        assert_eq!(params.cloud_high_max_percent, 15.0);
        assert_eq!(params.uncertainty_low, 0.5);
        assert_eq!(params.reference_index, 0.6);
        assert_eq!(params.coefficients, CoefficientTable::default());
    }
}

//! Vegetation signal consumed by the engine.

use crate::{EstimationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Vegetation index statistics and land-cover mix for one parcel.
///
/// Produced fresh for each calculation by a signal source (simulated or live).
/// The land-cover map is ordered so that estimation is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetationSignal {
    /// Mean vegetation index (NDVI) over the parcel, in [-1, 1].
    pub mean_index: f64,
    /// Standard deviation of the index over the parcel.
    pub index_std_dev: f64,
    /// Percentage of the parcel per land-cover label; sums to ~100.
    pub land_cover: BTreeMap<String, f64>,
    /// Cloud-contaminated share of the observations, in [0, 100].
    pub cloud_coverage_percent: f64,
}

impl VegetationSignal {
    /// Create a signal with an empty land-cover breakdown.
    pub fn new(mean_index: f64, index_std_dev: f64, cloud_coverage_percent: f64) -> Self {
        Self {
            mean_index,
            index_std_dev,
            land_cover: BTreeMap::new(),
            cloud_coverage_percent,
        }
    }

    /// Add or replace a land-cover category.
    pub fn with_cover(mut self, label: impl Into<String>, percent: f64) -> Self {
        self.land_cover.insert(label.into(), percent);
        self
    }

    /// Sum of all land-cover percentages.
    pub fn land_cover_total(&self) -> f64 {
        self.land_cover.values().sum()
    }

    /// Check that all fields are within their documented ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.mean_index.is_finite() || !(-1.0..=1.0).contains(&self.mean_index) {
            return Err(EstimationError::IndexOutOfRange(self.mean_index));
        }
        if !self.index_std_dev.is_finite() || self.index_std_dev < 0.0 {
            return Err(EstimationError::InvalidStdDev(self.index_std_dev));
        }
        if !self.cloud_coverage_percent.is_finite()
            || !(0.0..=100.0).contains(&self.cloud_coverage_percent)
        {
            return Err(EstimationError::CloudCoverageOutOfRange(
                self.cloud_coverage_percent,
            ));
        }
        if self.land_cover.is_empty() {
            return Err(EstimationError::EmptyLandCover);
        }
        for (label, &value) in &self.land_cover {
            if !value.is_finite() || value < 0.0 {
                return Err(EstimationError::InvalidPercentage {
                    label: label.clone(),
                    value,
                });
            }
        }
        Ok(())
    }
}

//! Per-category carbon coefficients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Carbon density coefficients for one land-cover category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarbonCoefficients {
    /// Above-ground biomass carbon at the reference index (tonnes C/ha).
    pub above_ground_per_ha: f64,
    /// Soil organic carbon (tonnes C/ha).
    pub soil_per_ha: f64,
    /// Below-ground to above-ground biomass ratio.
    pub root_to_shoot: f64,
}

impl CarbonCoefficients {
    /// Create a coefficient triple.
    pub const fn new(above_ground_per_ha: f64, soil_per_ha: f64, root_to_shoot: f64) -> Self {
        Self {
            above_ground_per_ha,
            soil_per_ha,
            root_to_shoot,
        }
    }
}

/// Canonical form of a land-cover label.
///
/// Trims, lowercases, turns spaces and dashes into underscores, then
/// capitalizes the first letter: `"bare soil"` becomes `"Bare_soil"`.
pub fn normalize_category(label: &str) -> String {
    let lowered: String = label
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Coefficient lookup table with a conservative fallback for unknown labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoefficientTable {
    /// Coefficients keyed by canonical category label.
    pub categories: BTreeMap<String, CarbonCoefficients>,
    /// Used for labels missing from `categories`.
    pub fallback: CarbonCoefficients,
}

impl Default for CoefficientTable {
    fn default() -> Self {
        let categories = [
            ("Forest", CarbonCoefficients::new(120.0, 90.0, 0.24)),
            ("Shrubland", CarbonCoefficients::new(30.0, 60.0, 0.40)),
            ("Grassland", CarbonCoefficients::new(8.0, 55.0, 1.60)),
            ("Cropland", CarbonCoefficients::new(5.0, 45.0, 0.20)),
            ("Wetland", CarbonCoefficients::new(40.0, 180.0, 0.30)),
            ("Mangrove", CarbonCoefficients::new(110.0, 250.0, 0.49)),
            ("Urban", CarbonCoefficients::new(8.0, 20.0, 0.20)),
            ("Bare_soil", CarbonCoefficients::new(0.5, 10.0, 0.10)),
            ("Water", CarbonCoefficients::new(0.0, 0.0, 0.0)),
            ("Snow_ice", CarbonCoefficients::new(0.0, 0.0, 0.0)),
        ]
        .into_iter()
        .map(|(label, coeffs)| (label.to_string(), coeffs))
        .collect();

        Self {
            categories,
            fallback: CarbonCoefficients::new(10.0, 30.0, 0.25),
        }
    }
}

impl CoefficientTable {
    /// Look up coefficients for a label, falling back for unknown categories.
    ///
    /// Returns the coefficients and whether the label was known.
    pub fn lookup(&self, label: &str) -> (CarbonCoefficients, bool) {
        match self.categories.get(&normalize_category(label)) {
            Some(coeffs) => (*coeffs, true),
            None => (self.fallback, false),
        }
    }

    /// Merge overrides on top of this table. Override keys are normalized.
    pub fn merge(&mut self, overrides: &BTreeMap<String, CarbonCoefficients>) {
        for (label, coeffs) in overrides {
            self.categories.insert(normalize_category(label), *coeffs);
        }
    }
}

//! Land-cover class codes from the live land-cover product.

use std::collections::BTreeMap;

/// Label used for class codes outside the known legend.
pub const UNCLASSIFIED: &str = "Other";

/// Map a land-cover class code to a coefficient category.
pub fn category_for_code(code: u32) -> &'static str {
    match code {
        10 => "Forest",
        20 => "Shrubland",
        30 => "Grassland",
        40 => "Cropland",
        50 => "Urban",
        60 => "Bare_soil",
        70 => "Snow_ice",
        80 => "Water",
        90 => "Wetland",
        95 => "Mangrove",
        // Moss and lichen.
        100 => "Grassland",
        _ => UNCLASSIFIED,
    }
}

/// Convert a pixel-count histogram keyed by class code into percentages per
/// category. Returns an empty map when no pixels were counted.
///
/// Codes that share a category are merged. Keys that are not integer codes
/// are treated as [`UNCLASSIFIED`].
pub fn histogram_to_percentages<'a, I>(histogram: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut counts: BTreeMap<&'static str, f64> = BTreeMap::new();
    for (key, count) in histogram {
        if !count.is_finite() || count <= 0.0 {
            continue;
        }
        let category = key
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|c| c.fract() == 0.0 && *c >= 0.0)
            .map(|c| category_for_code(c as u32))
            .unwrap_or(UNCLASSIFIED);
        *counts.entry(category).or_default() += count;
    }

    let total: f64 = counts.values().sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    counts
        .into_iter()
        .map(|(category, count)| (category.to_string(), (count / total * 10_000.0).round() / 100.0))
        .collect()
}

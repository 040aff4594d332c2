//! Deterministic simulated vegetation signal.
//!
//! Values are drawn from a ChaCha RNG seeded with a SHA-256 digest of the
//! parcel centroid (rounded to 1e-4 degrees) and the reference year and
//! month, so the same parcel in the same month always yields the same signal.

use crate::{DateRange, Result, VegetationSignalEstimator};
use canopy_engine::VegetationSignal;
use canopy_geo::{Coordinate, Polygon};
use chrono::{Datelike, NaiveDate, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use sha2::{Digest, Sha256};
use std::f64::consts::PI;
use tracing::debug;

/// Method tag for estimates built from the simulated signal.
pub const SIMULATED_METHOD: &str = "simulated_ndvi_v1";

const INDEX_NOISE_STD_DEV: f64 = 0.03;
const COVER_JITTER_STD_DEV: f64 = 0.15;

/// Latitude band used to bias the simulated index and land-cover mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatitudeBand {
    /// |lat| < 15
    Tropical,
    /// 15 <= |lat| < 35
    Arid,
    /// 35 <= |lat| < 55
    Temperate,
    /// Everything poleward.
    Mixed,
}

impl LatitudeBand {
    pub fn for_latitude(lat: f64) -> Self {
        match lat.abs() {
            l if l < 15.0 => LatitudeBand::Tropical,
            l if l < 35.0 => LatitudeBand::Arid,
            l if l < 55.0 => LatitudeBand::Temperate,
            _ => LatitudeBand::Mixed,
        }
    }

    fn base_index(self) -> f64 {
        match self {
            LatitudeBand::Tropical => 0.72,
            LatitudeBand::Arid => 0.30,
            LatitudeBand::Temperate => 0.60,
            LatitudeBand::Mixed => 0.45,
        }
    }

    fn seasonal_amplitude(self) -> f64 {
        match self {
            LatitudeBand::Tropical => 0.05,
            LatitudeBand::Arid => 0.08,
            LatitudeBand::Temperate => 0.15,
            LatitudeBand::Mixed => 0.20,
        }
    }

    fn max_cloud_percent(self) -> f64 {
        match self {
            LatitudeBand::Tropical => 60.0,
            LatitudeBand::Arid => 15.0,
            LatitudeBand::Temperate => 40.0,
            LatitudeBand::Mixed => 45.0,
        }
    }

    fn cover_weights(self) -> &'static [(&'static str, f64)] {
        match self {
            LatitudeBand::Tropical => &[
                ("Forest", 55.0),
                ("Cropland", 15.0),
                ("Grassland", 10.0),
                ("Shrubland", 10.0),
                ("Wetland", 5.0),
                ("Urban", 5.0),
            ],
            LatitudeBand::Arid => &[
                ("Bare_soil", 40.0),
                ("Shrubland", 30.0),
                ("Grassland", 15.0),
                ("Cropland", 10.0),
                ("Urban", 5.0),
            ],
            LatitudeBand::Temperate => &[
                ("Forest", 45.0),
                ("Cropland", 25.0),
                ("Grassland", 20.0),
                ("Shrubland", 5.0),
                ("Urban", 5.0),
            ],
            LatitudeBand::Mixed => &[
                ("Forest", 30.0),
                ("Grassland", 25.0),
                ("Shrubland", 20.0),
                ("Wetland", 10.0),
                ("Bare_soil", 10.0),
                ("Snow_ice", 5.0),
            ],
        }
    }
}

/// Offline signal source: location- and season-correlated pseudo-random values.
///
/// Never fails and never performs I/O.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSignal {
    today: Option<NaiveDate>,
}

impl SimulatedSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `date` instead of the current UTC date when no range is given.
    pub fn with_reference_date(date: NaiveDate) -> Self {
        Self { today: Some(date) }
    }

    fn reference_date(&self, range: Option<&DateRange>) -> NaiveDate {
        range
            .map(DateRange::end)
            .or(self.today)
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Simulate the signal for a centroid in the month containing `date`.
    pub fn simulate(&self, centroid: Coordinate, date: NaiveDate) -> VegetationSignal {
        let mut rng = ChaCha8Rng::from_seed(seed_for(centroid, date));
        let band = LatitudeBand::for_latitude(centroid.lat);

        // Growing season peaks in July north of the equator and January south of it.
        let peak_month = if centroid.lat >= 0.0 { 7.0 } else { 1.0 };
        let phase = 2.0 * PI * (f64::from(date.month()) - peak_month) / 12.0;
        let seasonal = band.seasonal_amplitude() * phase.cos();

        let mean_index = (band.base_index() + seasonal + gaussian(&mut rng, INDEX_NOISE_STD_DEV)).clamp(0.0, 0.95);
        let index_std_dev = rng.gen_range(0.04..0.22);
        let cloud_coverage_percent = rng.gen_range(0.0..band.max_cloud_percent());

        let mut signal = VegetationSignal::new(round4(mean_index), round4(index_std_dev), round2(cloud_coverage_percent));
        for (label, percent) in normalized_cover(band, &mut rng) {
            signal = signal.with_cover(label, percent);
        }

        debug!(
            lat = centroid.lat,
            lon = centroid.lon,
            ?band,
            mean_index = signal.mean_index,
            cloud = signal.cloud_coverage_percent,
            "simulated vegetation signal"
        );
        signal
    }
}

impl VegetationSignalEstimator for SimulatedSignal {
    fn method(&self) -> &'static str {
        SIMULATED_METHOD
    }

    fn estimate_signal(&self, polygon: &Polygon, range: Option<&DateRange>) -> Result<VegetationSignal> {
        Ok(self.simulate(polygon.centroid(), self.reference_date(range)))
    }
}

fn seed_for(centroid: Coordinate, date: NaiveDate) -> [u8; 32] {
    let lat = (centroid.lat * 1e4).round() as i64;
    let lon = (centroid.lon * 1e4).round() as i64;
    let key = format!("{lat}:{lon}:{}:{}", date.year(), date.month());
    Sha256::digest(key.as_bytes()).into()
}

fn gaussian(rng: &mut ChaCha8Rng, std_dev: f64) -> f64 {
    Normal::new(0.0, std_dev).map(|n| n.sample(rng)).unwrap_or(0.0)
}

/// Jitter the band weights and scale them to sum to exactly 100.
fn normalized_cover(band: LatitudeBand, rng: &mut ChaCha8Rng) -> Vec<(&'static str, f64)> {
    let jittered: Vec<(&'static str, f64)> = band
        .cover_weights()
        .iter()
        .map(|&(label, weight)| (label, (weight * (1.0 + gaussian(rng, COVER_JITTER_STD_DEV))).max(0.0)))
        .collect();
    let total: f64 = jittered.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return band.cover_weights().to_vec();
    }

    let mut cover: Vec<(&'static str, f64)> = jittered
        .into_iter()
        .map(|(label, w)| (label, round2(w / total * 100.0)))
        .filter(|&(_, pct)| pct > 0.0)
        .collect();

    // Push the rounding residual onto the largest share.
    let residual = 100.0 - cover.iter().map(|(_, p)| p).sum::<f64>();
    if let Some(largest) = cover.iter_mut().max_by(|a, b| a.1.total_cmp(&b.1)) {
        largest.1 = round2(largest.1 + residual);
    }
    cover
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bands() {
        assert_eq!(LatitudeBand::for_latitude(0.0), LatitudeBand::Tropical);
        assert_eq!(LatitudeBand::for_latitude(-14.9), LatitudeBand::Tropical);
        assert_eq!(LatitudeBand::for_latitude(25.0), LatitudeBand::Arid);
        assert_eq!(LatitudeBand::for_latitude(-45.0), LatitudeBand::Temperate);
        assert_eq!(LatitudeBand::for_latitude(64.0), LatitudeBand::Mixed);
    }

    #[test]
    fn test_deterministic_within_month() {
        let sim = SimulatedSignal::new();
        let c = Coordinate::new(-3.12345, 51.5);
        let a = sim.simulate(c, date(2024, 6, 1));
        let b = sim.simulate(c, date(2024, 6, 28));
        assert_eq!(a, b);
    }

    #[test]
    fn test_tiny_centroid_shift_is_same_parcel() {
        let sim = SimulatedSignal::new();
        let a = sim.simulate(Coordinate::new(10.00001, 45.0), date(2024, 6, 1));
        let b = sim.simulate(Coordinate::new(10.00002, 45.0), date(2024, 6, 1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_month_changes_signal() {
        let sim = SimulatedSignal::new();
        let c = Coordinate::new(10.0, 45.0);
        assert_ne!(sim.simulate(c, date(2024, 6, 1)), sim.simulate(c, date(2024, 7, 1)));
    }

    #[test]
    fn test_cover_sums_to_100_and_values_in_range() {
        let sim = SimulatedSignal::new();
        for (i, lat) in [-70.0, -40.0, -20.0, 0.0, 5.0, 25.0, 45.0, 60.0, 80.0].into_iter().enumerate() {
            for month in 1..=12 {
                let signal = sim.simulate(Coordinate::new(i as f64 * 7.3 - 30.0, lat), date(2023, month, 15));
                assert_abs_diff_eq!(signal.land_cover_total(), 100.0, epsilon = 1e-6);
                assert!(signal.land_cover.values().all(|&p| p > 0.0));
                assert!(signal.validate().is_ok(), "{signal:?}");
            }
        }
    }

    #[test]
    fn test_growing_season_and_equator_bias() {
        let sim = SimulatedSignal::new();
        // Average over many nearby parcels to wash out noise.
        let mean_at = |lat: f64, month: u32| {
            let n = 50;
            (0..n)
                .map(|i| sim.simulate(Coordinate::new(i as f64 * 0.37, lat), date(2024, month, 1)).mean_index)
                .sum::<f64>()
                / n as f64
        };
        assert!(mean_at(45.0, 7) > mean_at(45.0, 1));
        assert!(mean_at(-45.0, 1) > mean_at(-45.0, 7));
        assert!(mean_at(2.0, 4) > mean_at(25.0, 4));
    }

    #[test]
    fn test_reference_date_precedence() {
        let sim = SimulatedSignal::with_reference_date(date(2024, 1, 10));
        let range = DateRange::new(date(2024, 5, 1), date(2024, 7, 20)).unwrap();
        assert_eq!(sim.reference_date(Some(&range)), date(2024, 7, 20));
        assert_eq!(sim.reference_date(None), date(2024, 1, 10));
    }
}

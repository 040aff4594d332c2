//! Planar shoelace area over raw degrees.

use crate::Coordinate;

/// Metres per degree used by the equirectangular approximation.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Hectares covered by one square degree at the equator.
///
/// `111_320 m * 111_320 m / 10_000 m²` ≈ 1 239 214 ha.
pub const HECTARES_PER_SQUARE_DEGREE: f64 = METERS_PER_DEGREE * METERS_PER_DEGREE / 10_000.0;

/// Compute the approximate area of a ring in hectares.
///
/// The ring may be open or closed; the closing edge is implied. Rings with
/// fewer than three points return `0.0`. Self-intersecting or degenerate
/// rings are not detected and yield whatever the shoelace sum produces
/// (usually zero or close to it).
pub fn compute_area_hectares(ring: &[Coordinate]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let n = ring.len();
    let mut twice_area = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        twice_area += a.lon * b.lat - b.lon * a.lat;
    }

    (twice_area / 2.0).abs() * HECTARES_PER_SQUARE_DEGREE
}

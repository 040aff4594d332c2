//! Area checks against shapes with known analytic areas.

use approx::assert_relative_eq;
use canopy_geo::{compute_area_hectares, Coordinate, Polygon, HECTARES_PER_SQUARE_DEGREE};

fn ring(points: &[(f64, f64)]) -> Vec<Coordinate> {
    points.iter().copied().map(Coordinate::from).collect()
}

#[test]
fn test_rectangle_matches_analytic_area() {
    let (w, h) = (0.003, 0.0015);
    let coords = ring(&[(5.0, -2.0), (5.0 + w, -2.0), (5.0 + w, -2.0 + h), (5.0, -2.0 + h)]);
    assert_relative_eq!(
        compute_area_hectares(&coords),
        w * h * HECTARES_PER_SQUARE_DEGREE,
        max_relative = 1e-9
    );
}

#[test]
fn test_right_triangle_matches_analytic_area() {
    let coords = ring(&[(0.0, 0.0), (0.002, 0.0), (0.0, 0.004)]);
    assert_relative_eq!(
        compute_area_hectares(&coords),
        0.5 * 0.002 * 0.004 * HECTARES_PER_SQUARE_DEGREE,
        max_relative = 1e-9
    );
}

#[test]
fn test_regular_hexagon_matches_analytic_area() {
    let r = 0.001;
    let coords: Vec<Coordinate> = (0..6)
        .map(|i| {
            let theta = std::f64::consts::PI / 3.0 * i as f64;
            Coordinate::new(30.0 + r * theta.cos(), 10.0 + r * theta.sin())
        })
        .collect();
    let analytic = 3.0 * 3f64.sqrt() / 2.0 * r * r * HECTARES_PER_SQUARE_DEGREE;
    assert_relative_eq!(compute_area_hectares(&coords), analytic, max_relative = 1e-6);
}

#[test]
fn test_concave_l_shape() {
    // 2x2 square with a 1x1 corner removed, in units of 0.001 degrees.
    let u = 0.001;
    let coords = ring(&[
        (0.0, 0.0),
        (2.0 * u, 0.0),
        (2.0 * u, u),
        (u, u),
        (u, 2.0 * u),
        (0.0, 2.0 * u),
    ]);
    assert_relative_eq!(
        compute_area_hectares(&coords),
        3.0 * u * u * HECTARES_PER_SQUARE_DEGREE,
        max_relative = 1e-9
    );
}

#[test]
fn test_polygon_area_uses_exterior_ring_only() {
    let value = serde_json::json!({
        "type": "Polygon",
        "coordinates": [
            [[0.0, 0.0], [0.01, 0.0], [0.01, 0.01], [0.0, 0.01], [0.0, 0.0]],
            [[0.002, 0.002], [0.004, 0.002], [0.004, 0.004], [0.002, 0.002]]
        ]
    });
    let polygon = Polygon::from_json_value(&value).unwrap();
    assert_relative_eq!(
        polygon.area_hectares(),
        1e-4 * HECTARES_PER_SQUARE_DEGREE,
        max_relative = 1e-9
    );
}

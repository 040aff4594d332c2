//! Polygon types and GeoJSON conversion.

use crate::{compute_area_hectares, GeometryError, Result};
use serde::{Deserialize, Serialize};

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees (-180 to 180).
    pub lon: f64,
    /// Latitude in degrees (-90 to 90).
    pub lat: f64,
}

impl Coordinate {
    /// Create a coordinate from longitude and latitude.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

/// Bounding box of a ring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum longitude.
    pub min_lon: f64,
    /// Minimum latitude.
    pub min_lat: f64,
    /// Maximum longitude.
    pub max_lon: f64,
    /// Maximum latitude.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Check if a coordinate falls within the box (inclusive).
    pub fn contains(&self, c: Coordinate) -> bool {
        c.lon >= self.min_lon && c.lon <= self.max_lon && c.lat >= self.min_lat && c.lat <= self.max_lat
    }
}

/// A closed ring: the first and last coordinate are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring(Vec<Coordinate>);

impl Ring {
    /// Build a ring from coordinates, appending the first point if the ring is open.
    pub fn closed(mut coords: Vec<Coordinate>) -> Self {
        if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
            if first != last {
                coords.push(first);
            }
        }
        Ring(coords)
    }

    /// All coordinates including the closing point.
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.0
    }

    /// Coordinates without the closing point.
    pub fn vertices(&self) -> &[Coordinate] {
        match self.0.len() {
            0 | 1 => &self.0,
            n => &self.0[..n - 1],
        }
    }

    /// Number of distinct vertices in the ring.
    pub fn distinct_vertex_count(&self) -> usize {
        let mut seen: Vec<(u64, u64)> = self
            .vertices()
            .iter()
            .map(|c| (zero_normalized_bits(c.lon), zero_normalized_bits(c.lat)))
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

/// Bit pattern with `-0.0` folded onto `0.0`.
fn zero_normalized_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// The GeoJSON shape accepted from clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonPolygon {
    /// Geometry type, must be `Polygon`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Rings of `[lon, lat]` positions; the first is the exterior.
    pub coordinates: Vec<Vec<Vec<f64>>>,
}

/// A validated parcel polygon.
///
/// Only the exterior ring is kept. Holes are accepted in the input but do not
/// contribute to area or signal estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: Ring,
}

impl Polygon {
    /// Build a polygon from an exterior ring, validating it.
    ///
    /// Requires at least 3 distinct vertices, finite coordinates, and
    /// longitudes/latitudes within their valid ranges.
    pub fn new(coords: Vec<Coordinate>) -> Result<Self> {
        for (index, c) in coords.iter().enumerate() {
            if !c.lon.is_finite() || !c.lat.is_finite() {
                return Err(GeometryError::NonFiniteCoordinate { index });
            }
            if !(-180.0..=180.0).contains(&c.lon) || !(-90.0..=90.0).contains(&c.lat) {
                return Err(GeometryError::CoordinateOutOfRange {
                    index,
                    lon: c.lon,
                    lat: c.lat,
                });
            }
        }

        let exterior = Ring::closed(coords);
        let distinct = exterior.distinct_vertex_count();
        if distinct < 3 {
            return Err(GeometryError::TooFewVertices(distinct));
        }

        Ok(Self { exterior })
    }

    /// Parse and validate a GeoJSON polygon.
    pub fn from_geojson(geojson: &GeoJsonPolygon) -> Result<Self> {
        if geojson.kind != "Polygon" {
            return Err(GeometryError::WrongGeometryType(geojson.kind.clone()));
        }
        let ring = geojson.coordinates.first().ok_or(GeometryError::MissingRing)?;

        let mut coords = Vec::with_capacity(ring.len());
        for (index, position) in ring.iter().enumerate() {
            if position.len() < 2 {
                return Err(GeometryError::MalformedPosition {
                    index,
                    len: position.len(),
                });
            }
            coords.push(Coordinate::new(position[0], position[1]));
        }

        Self::new(coords)
    }

    /// Decode and validate a GeoJSON polygon from an arbitrary JSON value.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self> {
        let geojson: GeoJsonPolygon = serde_json::from_value(value.clone())
            .map_err(|e| GeometryError::Malformed(e.to_string()))?;
        Self::from_geojson(&geojson)
    }

    /// Convert back to a GeoJSON polygon (exterior ring only, closed).
    pub fn to_geojson(&self) -> GeoJsonPolygon {
        GeoJsonPolygon {
            kind: "Polygon".to_string(),
            coordinates: vec![self
                .exterior
                .coordinates()
                .iter()
                .map(|c| vec![c.lon, c.lat])
                .collect()],
        }
    }

    /// The closed exterior ring.
    pub fn exterior(&self) -> &Ring {
        &self.exterior
    }

    /// Approximate area in hectares. See [`compute_area_hectares`].
    pub fn area_hectares(&self) -> f64 {
        compute_area_hectares(self.exterior.coordinates())
    }

    /// Vertex-average centroid of the distinct vertices.
    ///
    /// Good enough for latitude banding and seeding; not an area centroid.
    pub fn centroid(&self) -> Coordinate {
        let vertices = self.exterior.vertices();
        let n = vertices.len() as f64;
        let (lon, lat) = vertices
            .iter()
            .fold((0.0, 0.0), |(lon, lat), c| (lon + c.lon, lat + c.lat));
        Coordinate::new(lon / n, lat / n)
    }

    /// Bounding box of the exterior ring.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox {
            min_lon: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for c in self.exterior.coordinates() {
            bbox.min_lon = bbox.min_lon.min(c.lon);
            bbox.min_lat = bbox.min_lat.min(c.lat);
            bbox.max_lon = bbox.max_lon.max(c.lon);
            bbox.max_lat = bbox.max_lat.max(c.lat);
        }
        bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn unit_square_json() -> serde_json::Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[10.0, 45.0], [10.01, 45.0], [10.01, 45.01], [10.0, 45.01], [10.0, 45.0]]]
        })
    }

    #[test]
    fn test_ring_auto_closes() {
        let ring = Ring::closed(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(1.0, 1.0),
        ]);
        let coords = ring.coordinates();
        assert_eq!(coords.len(), 4);
        assert_eq!(coords.first(), coords.last());
        assert_eq!(ring.vertices().len(), 3);
    }

    #[test]
    fn test_ring_already_closed_is_untouched() {
        let ring = Ring::closed(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(0.0, 0.0),
        ]);
        assert_eq!(ring.coordinates().len(), 4);
    }

    #[test]
    fn test_from_json_value() {
        let polygon = Polygon::from_json_value(&unit_square_json()).unwrap();
        assert_eq!(polygon.exterior().distinct_vertex_count(), 4);
        assert_relative_eq!(polygon.area_hectares(), 123.921_424, epsilon = 1e-3);
    }

    #[test]
    fn test_wrong_type_rejected() {
        let value = json!({"type": "Point", "coordinates": [[[0.0, 0.0]]]});
        assert_eq!(
            Polygon::from_json_value(&value),
            Err(GeometryError::WrongGeometryType("Point".to_string()))
        );
    }

    #[test]
    fn test_missing_coordinates_is_malformed() {
        let value = json!({"type": "Polygon"});
        assert!(matches!(
            Polygon::from_json_value(&value),
            Err(GeometryError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_ring_list() {
        let geojson = GeoJsonPolygon {
            kind: "Polygon".to_string(),
            coordinates: vec![],
        };
        assert_eq!(Polygon::from_geojson(&geojson), Err(GeometryError::MissingRing));
    }

    #[test]
    fn test_short_position_rejected() {
        let value = json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0], [1.0, 1.0]]]});
        assert_eq!(
            Polygon::from_json_value(&value),
            Err(GeometryError::MalformedPosition { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_duplicate_vertices_do_not_count() {
        let coords = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(0.0, 0.0),
        ];
        assert_eq!(Polygon::new(coords), Err(GeometryError::TooFewVertices(2)));
    }

    #[test]
    fn test_signed_zero_is_one_vertex() {
        let coords = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(-0.0, 0.0),
            Coordinate::new(1.0, 1.0),
        ];
        assert_eq!(Polygon::new(coords), Err(GeometryError::TooFewVertices(2)));

        let value = serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [-0.0, -0.0], [1.0, 1.0], [0.0, 0.0]]]
        });
        assert_eq!(Polygon::from_json_value(&value), Err(GeometryError::TooFewVertices(2)));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let coords = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(190.0, 0.0),
            Coordinate::new(1.0, 1.0),
        ];
        assert!(matches!(
            Polygon::new(coords),
            Err(GeometryError::CoordinateOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn test_nan_rejected() {
        let coords = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, f64::NAN),
            Coordinate::new(1.0, 1.0),
        ];
        assert_eq!(
            Polygon::new(coords),
            Err(GeometryError::NonFiniteCoordinate { index: 1 })
        );
    }

    #[test]
    fn test_centroid_and_bbox() {
        let polygon = Polygon::from_json_value(&unit_square_json()).unwrap();
        let centroid = polygon.centroid();
        assert_relative_eq!(centroid.lon, 10.005, epsilon = 1e-12);
        assert_relative_eq!(centroid.lat, 45.005, epsilon = 1e-12);

        let bbox = polygon.bounding_box();
        assert_eq!(bbox.min_lon, 10.0);
        assert_eq!(bbox.max_lat, 45.01);
        assert!(bbox.contains(centroid));
    }

    #[test]
    fn test_geojson_roundtrip_keeps_closure() {
        let polygon = Polygon::new(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(1.0, 1.0),
        ])
        .unwrap();
        let geojson = polygon.to_geojson();
        assert_eq!(geojson.kind, "Polygon");
        assert_eq!(geojson.coordinates[0].len(), 4);
        assert_eq!(Polygon::from_geojson(&geojson).unwrap(), polygon);
    }
}

//! Error types for the geometry crate.

use thiserror::Error;

/// Errors raised while parsing or validating a parcel geometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// The GeoJSON `type` member was not `Polygon`.
    #[error("Unsupported geometry type '{0}' (expected Polygon)")]
    WrongGeometryType(String),

    /// The polygon has no exterior ring.
    #[error("Polygon has no exterior ring")]
    MissingRing,

    /// A position has fewer than two components.
    #[error("Position {index} has {len} components (expected at least 2)")]
    MalformedPosition {
        /// Index of the position within the exterior ring.
        index: usize,
        /// Number of components found.
        len: usize,
    },

    /// A coordinate is NaN or infinite.
    #[error("Position {index} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// Index of the position within the exterior ring.
        index: usize,
    },

    /// A coordinate is outside the valid longitude/latitude range.
    #[error("Position {index} ({lon}, {lat}) is outside [-180, 180] x [-90, 90]")]
    CoordinateOutOfRange {
        /// Index of the position within the exterior ring.
        index: usize,
        /// Longitude in degrees.
        lon: f64,
        /// Latitude in degrees.
        lat: f64,
    },

    /// The ring has fewer than three distinct vertices.
    #[error("Polygon needs at least 3 distinct vertices, found {0}")]
    TooFewVertices(usize),

    /// The GeoJSON value could not be decoded.
    #[error("Malformed GeoJSON polygon: {0}")]
    Malformed(String),
}

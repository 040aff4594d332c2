//! # canopy-geo
//!
//! Geometry handling for carbon parcels drawn on a map.
//!
//! This crate provides:
//! - GeoJSON `Polygon` parsing and validation into a closed [`Ring`]
//! - An approximate planar area in hectares (shoelace over raw degrees)
//! - Centroid and bounding box helpers used by the vegetation signal sources
//!
//! ## Area approximation
//!
//! The area is computed with the shoelace formula directly on longitude and
//! latitude degrees and then scaled by [`HECTARES_PER_SQUARE_DEGREE`], which
//! assumes roughly 111.32 km per degree on both axes. The error grows with
//! distance from the equator (longitude degrees shrink by `cos(lat)`) and with
//! parcel size, so results are estimates rather than surveyed measurements.
//!
//! ## Example
//!
//! ```
//! use canopy_geo::{compute_area_hectares, Coordinate};
//!
//! let ring = [
//!     Coordinate::new(0.0, 0.0),
//!     Coordinate::new(0.01, 0.0),
//!     Coordinate::new(0.01, 0.01),
//!     Coordinate::new(0.0, 0.01),
//! ];
//! let hectares = compute_area_hectares(&ring);
//! assert!((hectares - 123.92).abs() < 0.01);
//! ```

mod area;
mod error;
mod polygon;

pub use area::{compute_area_hectares, HECTARES_PER_SQUARE_DEGREE, METERS_PER_DEGREE};
pub use error::GeometryError;
pub use polygon::{BoundingBox, Coordinate, GeoJsonPolygon, Polygon, Ring};

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeometryError>;

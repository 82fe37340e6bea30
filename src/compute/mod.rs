//! Compute layer: clustering, reach geometry and format conversion.
//!
//! Everything here is synchronous and free of I/O. The engine owns the
//! instances and decides when they are rebuilt.

pub mod cluster;
pub mod geojson;
pub mod projection;
pub mod reach;
pub mod validation;

pub use cluster::SpatialIndex;
pub use reach::ReachGeometryBuilder;
pub use validation::{validate_bbox, validate_coordinates, validate_location, validate_radius_km};

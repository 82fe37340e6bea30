//! # reachmap-types
//!
//! Core data types for the reachmap engine.
//!
//! This crate provides the values exchanged between the geocoding pipeline,
//! the clustering index, the reach geometry builder and a rendering adapter:
//!
//! - **Coordinates**: `Coordinates` (longitude/latitude pair, serialized as `[lng, lat]`)
//! - **Locations**: `Location`, `GeocodeResult`
//! - **Viewport types**: `BoundingBox`, `Viewport`
//! - **Cluster types**: `ClusterKey`, `ClusterPoint`, `Cluster`, `MarkerSet`, `MarkerDiff`
//! - **Reach types**: `PlaySelection`, `PlayColors`, `ReachStyle`, `ReachPolygon`
//!
//! All types are serializable with Serde and convert to `geo` primitives
//! where a geometric counterpart exists.
//!
//! ## Examples
//!
//! ```rust
//! use reachmap_types::bbox::BoundingBox;
//! use reachmap_types::coords::Coordinates;
//!
//! let phoenix = Coordinates::new(-112.074, 33.4484);
//! let southwest = BoundingBox::new(-115.0, 31.0, -109.0, 37.0);
//! assert!(southwest.contains(&phoenix));
//! ```

pub mod bbox;
pub mod cluster;
pub mod coords;
pub mod geocode;
pub mod location;
pub mod reach;

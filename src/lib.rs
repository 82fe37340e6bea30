//! Geocoding, viewport clustering and audience-reach geometry for map views.
//!
//! ```rust
//! use reachmap::{BoundingBox, EngineConfig, Location, MapEngine, OfflineProvider, Viewport};
//!
//! # tokio_test_block(async {
//! let engine = MapEngine::new(OfflineProvider, EngineConfig::default())?;
//! engine
//!     .load_locations(vec![Location::new("phx-1", "1 Van Buren St", "Phoenix", "AZ")])
//!     .await?;
//!
//! let markers = engine.on_viewport(&Viewport::new(BoundingBox::world(), 4))?;
//! assert_eq!(markers.total_points(), 1);
//! # Ok::<(), reachmap::ReachMapError>(())
//! # }).unwrap();
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod compute;
pub mod config;
pub mod engine;
pub mod error;
pub mod geocode;

pub use config::{ClusterOptions, EngineConfig, GeocoderConfig, ReachOptions};
pub use engine::{FlyTo, LoadOutcome, MapEngine};
pub use error::{ReachMapError, Result};

pub use compute::{ReachGeometryBuilder, SpatialIndex};

pub use geocode::{
    BatchGeocoder, BatchReport, CoordinateCache, GeocodeClient, GeocodeError, GeocodeProvider,
    MapboxGeocoder, OfflineProvider,
};

pub use reachmap_types::bbox::{BoundingBox, Viewport};
pub use reachmap_types::cluster::{
    Cluster, ClusterKey, ClusterPoint, MarkerDiff, MarkerId, MarkerSet,
};
pub use reachmap_types::coords::Coordinates;
pub use reachmap_types::geocode::GeocodeResult;
pub use reachmap_types::location::Location;
pub use reachmap_types::reach::{PlayColors, PlaySelection, ReachPolygon, ReachStyle};

pub use geo::{Point, Polygon};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{MapEngine, ReachMapError, Result};

    pub use crate::{ClusterOptions, EngineConfig, GeocoderConfig, ReachOptions};

    pub use crate::{BoundingBox, Cluster, ClusterKey, Coordinates, Location, MarkerSet, Viewport};

    pub use crate::{PlaySelection, ReachPolygon};

    pub use crate::{GeocodeProvider, MapboxGeocoder, OfflineProvider};

    pub use tokio_util::sync::CancellationToken;
}

//! Address geocoding.
//!
//! [`GeocodeClient`] resolves one address through the local
//! [`CoordinateCache`] or a [`GeocodeProvider`], retrying transient
//! failures. [`BatchGeocoder`] runs the client over a location list in
//! order and merges the results back in.

pub mod batch;
pub mod cache;
pub mod client;
pub mod error;
pub mod mapbox;
pub mod provider;
pub mod rate_limit;

pub use batch::{BatchGeocoder, BatchReport};
pub use cache::CoordinateCache;
pub use client::{GeocodeClient, Resolution};
pub use error::GeocodeError;
pub use mapbox::MapboxGeocoder;
pub use provider::{GeocodeProvider, OfflineProvider};

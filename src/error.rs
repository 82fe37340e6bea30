//! Error types for the reachmap engine.

use crate::geocode::GeocodeError;
use thiserror::Error;

/// Crate-level error.
///
/// Per-address geocoding failures never surface here; they are absorbed
/// into `GeocodeResult::Unresolved` by the geocoding pipeline.
#[derive(Error, Debug)]
pub enum ReachMapError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Geocoding provider error: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ReachMapError>;

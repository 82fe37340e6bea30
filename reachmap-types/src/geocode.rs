use crate::coords::Coordinates;
use serde::{Deserialize, Serialize};

/// Outcome of resolving one address.
///
/// `Unresolved` is a normal result (no match, or the service kept failing),
/// not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeResult {
    Resolved(Coordinates),
    Unresolved,
}

impl GeocodeResult {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            GeocodeResult::Resolved(c) => Some(*c),
            GeocodeResult::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, GeocodeResult::Resolved(_))
    }
}

impl From<Option<Coordinates>> for GeocodeResult {
    fn from(value: Option<Coordinates>) -> Self {
        value.map_or(GeocodeResult::Unresolved, GeocodeResult::Resolved)
    }
}

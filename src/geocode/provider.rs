use super::error::GeocodeError;
use reachmap_types::coords::Coordinates;
use std::future::Future;

/// A remote geocoding backend.
///
/// Returns candidates best-first; an empty list means the service found no
/// match. Implementations do no retrying or pacing of their own.
pub trait GeocodeProvider: Send + Sync {
    fn lookup(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<Coordinates>, GeocodeError>> + Send;
}

/// Provider that never finds anything. Resolution falls back to the local
/// city table alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

impl GeocodeProvider for OfflineProvider {
    async fn lookup(&self, _query: &str) -> Result<Vec<Coordinates>, GeocodeError> {
        Ok(Vec::new())
    }
}

use super::client::{GeocodeClient, Resolution};
use super::provider::GeocodeProvider;
use crate::error::{ReachMapError, Result};
use futures::StreamExt;
use reachmap_types::location::Location;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Counts from one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    /// Input locations that already carried coordinates.
    pub already_located: usize,
    pub cached: usize,
    pub remote: usize,
    pub unresolved: usize,
}

impl BatchReport {
    /// Locations that have coordinates after the run.
    pub fn located(&self) -> usize {
        self.already_located + self.cached + self.remote
    }

    fn record(&mut self, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::AlreadyLocated => self.already_located += 1,
            Outcome::Resolved(Resolution::Cached(_)) => self.cached += 1,
            Outcome::Resolved(Resolution::Remote(_)) => self.remote += 1,
            Outcome::Resolved(Resolution::Unresolved) => self.unresolved += 1,
        }
    }
}

enum Outcome {
    AlreadyLocated,
    Resolved(Resolution),
}

/// Geocodes a location list, preserving its order.
///
/// Up to `concurrency` lookups run at once; results are still emitted in
/// input order and every remote request passes through the client's shared
/// limiter.
#[derive(Debug)]
pub struct BatchGeocoder<P> {
    client: GeocodeClient<P>,
}

impl<P: GeocodeProvider> BatchGeocoder<P> {
    pub fn new(client: GeocodeClient<P>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GeocodeClient<P> {
        &self.client
    }

    /// Resolve every location lacking coordinates.
    ///
    /// The output has the same length and order as the input. Returns
    /// [`ReachMapError::Cancelled`] once `cancel` fires; no further lookups
    /// are started after that.
    pub async fn resolve_all(
        &self,
        locations: Vec<Location>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Location>> {
        self.resolve_with_report(locations, cancel)
            .await
            .map(|(locations, _)| locations)
    }

    pub async fn resolve_with_report(
        &self,
        locations: Vec<Location>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<Location>, BatchReport)> {
        if cancel.is_cancelled() {
            return Err(ReachMapError::Cancelled);
        }

        let total = locations.len();
        let concurrency = self.client.config().concurrency.max(1);
        log::info!(
            "Geocoding {} locations (concurrency {})",
            total,
            concurrency
        );

        let mut results =
            futures::stream::iter(locations.into_iter().map(|loc| self.resolve_one(loc)))
                .buffered(concurrency);

        let mut report = BatchReport::default();
        let mut resolved = Vec::with_capacity(total);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!(
                        "Geocoding batch cancelled after {} of {} locations",
                        resolved.len(),
                        total
                    );
                    return Err(ReachMapError::Cancelled);
                }
                next = results.next() => match next {
                    Some((location, outcome)) => {
                        report.record(&outcome);
                        resolved.push(location);
                    }
                    None => break,
                },
            }
        }

        log::info!(
            "Geocoding finished: {} located ({} cached, {} remote, {} already), {} unresolved",
            report.located(),
            report.cached,
            report.remote,
            report.already_located,
            report.unresolved
        );
        Ok((resolved, report))
    }

    async fn resolve_one(&self, location: Location) -> (Location, Outcome) {
        if location.has_coordinates() {
            return (location, Outcome::AlreadyLocated);
        }

        let resolution = self
            .client
            .resolve_traced(&location.address, &location.city, &location.state)
            .await;
        let location = match resolution.result().coordinates() {
            Some(c) => location.with_coordinates(c),
            None => location,
        };
        (location, Outcome::Resolved(resolution))
    }
}

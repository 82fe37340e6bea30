use super::cache::CoordinateCache;
use super::provider::GeocodeProvider;
use super::rate_limit::{Limiter, request_limiter};
use crate::config::GeocoderConfig;
use crate::error::{ReachMapError, Result};
use reachmap_types::coords::Coordinates;
use reachmap_types::geocode::GeocodeResult;

/// How an address was resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Cached(Coordinates),
    Remote(Coordinates),
    Unresolved,
}

impl Resolution {
    pub fn result(&self) -> GeocodeResult {
        match self {
            Resolution::Cached(c) | Resolution::Remote(c) => GeocodeResult::Resolved(*c),
            Resolution::Unresolved => GeocodeResult::Unresolved,
        }
    }
}

/// Resolves single addresses: local table first, then the remote provider
/// with pacing and retries.
///
/// Terminal failures come back as [`GeocodeResult::Unresolved`]; nothing
/// here returns an error for a single address.
pub struct GeocodeClient<P> {
    provider: P,
    cache: CoordinateCache,
    limiter: Option<Limiter>,
    config: GeocoderConfig,
}

impl<P: GeocodeProvider> GeocodeClient<P> {
    pub fn new(provider: P, config: GeocoderConfig) -> Result<Self> {
        config.validate().map_err(ReachMapError::InvalidConfig)?;
        let limiter = request_limiter(config.request_interval());
        Ok(Self {
            provider,
            cache: CoordinateCache::new(),
            limiter,
            config,
        })
    }

    pub fn with_cache(mut self, cache: CoordinateCache) -> Self {
        self.cache = cache;
        self
    }

    /// Share pacing with other clients talking to the same service.
    pub fn with_limiter(mut self, limiter: Option<Limiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }

    pub fn cache(&self) -> &CoordinateCache {
        &self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn resolve(&self, address: &str, city: &str, state: &str) -> GeocodeResult {
        self.resolve_traced(address, city, state).await.result()
    }

    /// Like [`resolve`](Self::resolve), also reporting where the answer came from.
    pub async fn resolve_traced(&self, address: &str, city: &str, state: &str) -> Resolution {
        if let Some(coordinates) = self.cache.lookup(city) {
            log::debug!("Cache hit for city {}", city.trim());
            return Resolution::Cached(coordinates);
        }

        let query = format!("{}, {}, {}", address, city, state);
        match self.lookup_remote(&query).await {
            Some(coordinates) => Resolution::Remote(coordinates),
            None => Resolution::Unresolved,
        }
    }

    async fn lookup_remote(&self, query: &str) -> Option<Coordinates> {
        let attempts = self.config.max_attempts.max(1);

        for attempt in 0..attempts {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }

            match self.provider.lookup(query).await {
                Ok(candidates) => {
                    return match candidates.first() {
                        Some(c) if c.is_valid() => Some(*c),
                        Some(c) => {
                            log::warn!(
                                "Discarding out-of-range result ({}, {}) for {}",
                                c.lng(),
                                c.lat(),
                                query
                            );
                            None
                        }
                        None => {
                            log::warn!("No geocoding results for {}", query);
                            None
                        }
                    };
                }
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.config.backoff_for_attempt(attempt);
                    log::debug!(
                        "Attempt {} of {} failed for {}: {}; retrying in {:?}",
                        attempt + 1,
                        attempts,
                        query,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    log::warn!(
                        "Giving up on {} after {} attempt(s): {}",
                        query,
                        attempt + 1,
                        e
                    );
                    return None;
                }
            }
        }
        None
    }
}

impl<P> std::fmt::Debug for GeocodeClient<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocodeClient")
            .field("cache_entries", &self.cache.len())
            .field("paced", &self.limiter.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::testing::{Reply, ScriptedProvider};
    use std::time::Duration;

    fn config() -> GeocoderConfig {
        GeocoderConfig::default().with_request_interval(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_cache_hit_skips_remote() {
        let provider = ScriptedProvider::new();
        let client = GeocodeClient::new(provider, config()).unwrap();

        let result = client.resolve("1 Main St", "phoenix", "AZ").await;
        assert_eq!(
            result,
            GeocodeResult::Resolved(Coordinates::new(-112.0740, 33.4484))
        );
        assert_eq!(client.provider().calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_first_candidate_wins() {
        let provider = ScriptedProvider::new().reply(
            "9 Oak Ave, Tucson, AZ",
            vec![Reply::Found(vec![
                Coordinates::new(-110.97, 32.22),
                Coordinates::new(-111.5, 33.0),
            ])],
        );
        let client = GeocodeClient::new(provider, config()).unwrap();

        let resolution = client.resolve_traced("9 Oak Ave", "Tucson", "AZ").await;
        assert_eq!(resolution, Resolution::Remote(Coordinates::new(-110.97, 32.22)));
        assert_eq!(client.provider().calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_results_not_retried() {
        let provider = ScriptedProvider::new();
        let client = GeocodeClient::new(provider, config()).unwrap();

        let result = client.resolve("5 Elm", "Nowhere Town", "ZZ").await;
        assert_eq!(result, GeocodeResult::Unresolved);
        assert_eq!(client.provider().calls(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_candidate_unresolved() {
        let provider = ScriptedProvider::new().reply(
            "1 Pole Rd, Santa, NP",
            vec![Reply::Found(vec![Coordinates::new(10.0, 91.0)])],
        );
        let client = GeocodeClient::new(provider, config()).unwrap();
        assert_eq!(
            client.resolve("1 Pole Rd", "Santa", "NP").await,
            GeocodeResult::Unresolved
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_backoff_then_unresolved() {
        let provider = ScriptedProvider::new().reply(
            "7 Pine, Flagstaff, AZ",
            vec![Reply::Status(500), Reply::Status(500), Reply::Status(500)],
        );
        let client = GeocodeClient::new(provider, config()).unwrap();

        let start = tokio::time::Instant::now();
        let result = client.resolve("7 Pine", "Flagstaff", "AZ").await;
        assert_eq!(result, GeocodeResult::Unresolved);
        assert_eq!(client.provider().calls(), 3);
        // 1s then 2s; no sleep after the last attempt.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers() {
        let provider = ScriptedProvider::new().reply(
            "7 Pine, Flagstaff, AZ",
            vec![
                Reply::Status(503),
                Reply::Found(vec![Coordinates::new(-111.65, 35.2)]),
            ],
        );
        let client = GeocodeClient::new(provider, config()).unwrap();

        let start = tokio::time::Instant::now();
        let result = client.resolve("7 Pine", "Flagstaff", "AZ").await;
        assert!(result.is_resolved());
        assert_eq!(client.provider().calls(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_decode_error_not_retried() {
        let provider =
            ScriptedProvider::new().reply("3 Ash, Yuma, AZ", vec![Reply::Malformed]);
        let client = GeocodeClient::new(provider, config()).unwrap();

        assert_eq!(
            client.resolve("3 Ash", "Yuma", "AZ").await,
            GeocodeResult::Unresolved
        );
        assert_eq!(client.provider().calls(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = GeocoderConfig {
            max_attempts: 0,
            ..GeocoderConfig::default()
        };
        assert!(GeocodeClient::new(ScriptedProvider::new(), bad).is_err());
    }
}

use reachmap::geocode::Resolution;
use reachmap::{
    BatchGeocoder, CoordinateCache, Coordinates, GeocodeClient, GeocodeError, GeocodeProvider,
    GeocodeResult, GeocoderConfig, Location, ReachMapError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Provider answering from a closure given the query and the call number.
struct FnProvider<F> {
    respond: F,
    calls: AtomicUsize,
}

impl<F> FnProvider<F>
where
    F: Fn(&str, usize) -> Result<Vec<Coordinates>, GeocodeError>,
{
    fn new(respond: F) -> Self {
        Self {
            respond,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> GeocodeProvider for FnProvider<F>
where
    F: Fn(&str, usize) -> Result<Vec<Coordinates>, GeocodeError> + Send + Sync,
{
    async fn lookup(&self, query: &str) -> Result<Vec<Coordinates>, GeocodeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(query, n)
    }
}

fn unpaced() -> GeocoderConfig {
    GeocoderConfig::default().with_request_interval(Duration::ZERO)
}

#[tokio::test]
async fn test_cache_hit_and_unknown_city() {
    let provider = FnProvider::new(|_, _| Ok(Vec::new()));
    let batch = BatchGeocoder::new(GeocodeClient::new(provider, unpaced()).unwrap());

    let input = vec![
        Location::new("1", "100 Central Ave", "PHOENIX", "AZ"),
        Location::new("2", "1 Nowhere Ln", "Nowhere Town", "ZZ"),
    ];
    let output = batch.resolve_all(input, &CancellationToken::new()).await.unwrap();

    assert_eq!(output.len(), 2);
    assert_eq!(output[0].coordinates, Some(Coordinates::new(-112.0740, 33.4484)));
    assert_eq!(output[1].coordinates, None);
    assert_eq!(batch.client().provider().calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_server_errors_leave_sibling_resolved() {
    let provider = FnProvider::new(|query, _| {
        if query.starts_with("13 Broken") {
            Err(GeocodeError::from_status(500, "Internal Server Error"))
        } else {
            Ok(vec![Coordinates::new(-110.9747, 32.2226)])
        }
    });
    let batch = BatchGeocoder::new(GeocodeClient::new(provider, unpaced()).unwrap());

    let input = vec![
        Location::new("broken", "13 Broken Rd", "Tucson", "AZ"),
        Location::new("fine", "14 Fine Rd", "Tucson", "AZ"),
    ];
    let start = tokio::time::Instant::now();
    let (output, report) = batch
        .resolve_with_report(input, &CancellationToken::new())
        .await
        .unwrap();

    assert!(output[0].coordinates.is_none());
    assert_eq!(output[1].coordinates, Some(Coordinates::new(-110.9747, 32.2226)));
    assert_eq!(report.unresolved, 1);
    assert_eq!(report.remote, 1);
    // Three attempts for the broken address, one for the sibling.
    assert_eq!(batch.client().provider().calls(), 4);
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_custom_backoff_schedule() {
    let provider = FnProvider::new(|_, n| {
        if n < 3 {
            Err(GeocodeError::from_status(429, r#"{"message":"Rate limit exceeded"}"#))
        } else {
            Ok(vec![Coordinates::new(-97.7431, 30.2672)])
        }
    });
    let config = unpaced()
        .with_max_attempts(4)
        .with_backoff_base(Duration::from_millis(100));
    let client = GeocodeClient::new(provider, config).unwrap();

    let start = tokio::time::Instant::now();
    let resolution = client.resolve_traced("1 Congress Ave", "Austin", "TX").await;
    assert_eq!(resolution, Resolution::Remote(Coordinates::new(-97.7431, 30.2672)));
    // 100 + 200 + 400 ms between the four attempts.
    assert_eq!(start.elapsed(), Duration::from_millis(700));
}

#[tokio::test]
async fn test_query_format_and_custom_cache() {
    let provider = FnProvider::new(|query, _| match query {
        "1 Main St, Springfield, IL" => Ok(vec![Coordinates::new(-89.65, 39.78)]),
        _ => Ok(Vec::new()),
    });
    let mut cache = CoordinateCache::empty();
    cache.insert("Phoenix", Coordinates::new(-112.0, 33.0));
    let client = GeocodeClient::new(provider, unpaced()).unwrap().with_cache(cache);

    assert_eq!(
        client.resolve("1 Main St", "Springfield", "IL").await,
        GeocodeResult::Resolved(Coordinates::new(-89.65, 39.78))
    );
    assert_eq!(
        client.resolve("2 Main St", "phoenix", "AZ").await,
        GeocodeResult::Resolved(Coordinates::new(-112.0, 33.0))
    );
    // Denver is in the default table but not in this cache.
    assert_eq!(
        client.resolve("3 Main St", "Denver", "CO").await,
        GeocodeResult::Unresolved
    );
    assert_eq!(client.provider().calls(), 2);
}

#[tokio::test]
async fn test_cancel_before_start() {
    let provider = FnProvider::new(|_, _| Ok(Vec::new()));
    let batch = BatchGeocoder::new(GeocodeClient::new(provider, unpaced()).unwrap());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = batch
        .resolve_all(vec![Location::new("1", "a", "Tulsa", "OK")], &cancel)
        .await;
    assert!(matches!(result, Err(ReachMapError::Cancelled)));
    assert_eq!(batch.client().provider().calls(), 0);
}

#[tokio::test]
async fn test_pacing_spaces_remote_requests() {
    let provider = FnProvider::new(|_, _| Ok(vec![Coordinates::new(-90.0, 35.0)]));
    let config = GeocoderConfig::default().with_request_interval(Duration::from_millis(40));
    let batch = BatchGeocoder::new(GeocodeClient::new(provider, config).unwrap());

    let input = (0..4)
        .map(|i| Location::new(i.to_string(), format!("{} River Rd", i), "Memphis", "TN"))
        .collect();
    let start = std::time::Instant::now();
    let output = batch.resolve_all(input, &CancellationToken::new()).await.unwrap();

    assert!(output.iter().all(Location::has_coordinates));
    // The first request is immediate, the next three wait one interval each.
    assert!(start.elapsed() >= Duration::from_millis(110));
}

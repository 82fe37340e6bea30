//! The map view engine: owns the geocoded location set, the current cluster
//! index and the reach overlay, and answers viewport and click events.
//!
//! Geocoding batches run concurrently with viewport queries. Each batch gets
//! a generation number; a batch only swaps its results in while it is still
//! the latest, checked under the state write lock. Starting a batch cancels
//! the previous one.

use crate::compute::cluster::SpatialIndex;
use crate::compute::reach::ReachGeometryBuilder;
use crate::config::EngineConfig;
use crate::error::{ReachMapError, Result};
use crate::geocode::{BatchGeocoder, BatchReport, GeocodeClient, GeocodeProvider, MapboxGeocoder};
use geo::Contains;
use parking_lot::{Mutex, RwLock};
use reachmap_types::bbox::{BoundingBox, Viewport};
use reachmap_types::cluster::{ClusterKey, MarkerSet};
use reachmap_types::coords::Coordinates;
use reachmap_types::location::Location;
use reachmap_types::reach::{PlaySelection, ReachPolygon};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Result of [`MapEngine::load_locations`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The batch finished while still the latest and is now live.
    Applied {
        batch_id: Uuid,
        report: BatchReport,
        indexed: usize,
    },
    /// A newer batch started before this one could be applied.
    Superseded { batch_id: Uuid },
}

impl LoadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LoadOutcome::Applied { .. })
    }
}

/// Camera move requested by a cluster click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyTo {
    pub center: Coordinates,
    pub zoom: u8,
}

struct EngineState {
    locations: Vec<Location>,
    by_id: FxHashMap<String, usize>,
    index: Arc<SpatialIndex>,
    selection: Option<PlaySelection>,
    reach: Vec<ReachPolygon>,
}

pub struct MapEngine<P> {
    config: EngineConfig,
    geocoder: BatchGeocoder<P>,
    reach: ReachGeometryBuilder,
    state: RwLock<EngineState>,
    generation: AtomicU64,
    current_batch: Mutex<CancellationToken>,
    shutdown: CancellationToken,
}

impl MapEngine<MapboxGeocoder> {
    /// Engine backed by the Mapbox geocoding service.
    pub fn mapbox(config: EngineConfig) -> Result<Self> {
        let provider = MapboxGeocoder::new(&config.geocoder)?;
        Self::new(provider, config)
    }
}

impl<P: GeocodeProvider> MapEngine<P> {
    pub fn new(provider: P, config: EngineConfig) -> Result<Self> {
        config.validate().map_err(ReachMapError::InvalidConfig)?;

        let client = GeocodeClient::new(provider, config.geocoder.clone())?;
        let reach = ReachGeometryBuilder::new(config.reach.clone())?;
        let index = SpatialIndex::build(Vec::new(), config.cluster.clone())?;

        Ok(Self {
            geocoder: BatchGeocoder::new(client),
            reach,
            state: RwLock::new(EngineState {
                locations: Vec::new(),
                by_id: FxHashMap::default(),
                index: Arc::new(index),
                selection: None,
                reach: Vec::new(),
            }),
            generation: AtomicU64::new(0),
            current_batch: Mutex::new(CancellationToken::new()),
            shutdown: CancellationToken::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn geocoder(&self) -> &BatchGeocoder<P> {
        &self.geocoder
    }

    /// Geocode `locations`, build a new index and make it live.
    ///
    /// Cancels any batch still running. Returns `Superseded` when a newer
    /// call started before this one finished, and
    /// [`ReachMapError::Cancelled`] after [`shutdown`](Self::shutdown).
    pub async fn load_locations(&self, locations: Vec<Location>) -> Result<LoadOutcome> {
        let batch_id = Uuid::new_v4();
        let token = self.shutdown.child_token();
        // Generation order must match token replacement order, or an older
        // call could cancel the latest batch.
        let generation = {
            let mut current = self.current_batch.lock();
            let previous = std::mem::replace(&mut *current, token.clone());
            previous.cancel();
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        log::info!(
            "Starting batch {} (generation {}) with {} locations",
            batch_id,
            generation,
            locations.len()
        );

        let (located, report) = match self.geocoder.resolve_with_report(locations, &token).await {
            Ok(done) => done,
            Err(ReachMapError::Cancelled) if !self.is_latest(generation) => {
                log::info!("Batch {} superseded during geocoding", batch_id);
                return Ok(LoadOutcome::Superseded { batch_id });
            }
            Err(e) => return Err(e),
        };

        let index = SpatialIndex::from_locations(&located, self.config.cluster.clone())?;
        let indexed = index.len();

        let mut state = self.state.write();
        if !self.is_latest(generation) {
            log::info!("Discarding stale batch {}", batch_id);
            return Ok(LoadOutcome::Superseded { batch_id });
        }

        state.by_id = located
            .iter()
            .enumerate()
            .map(|(i, loc)| (loc.id.clone(), i))
            .collect();
        state.index = Arc::new(index);
        let reach = match &state.selection {
            Some(selection) => self.reach.build_for_play(&located, selection),
            None => Vec::new(),
        };
        state.reach = reach;
        state.locations = located;

        log::info!(
            "Applied batch {}: {} of {} locations indexed",
            batch_id,
            indexed,
            report.total
        );
        Ok(LoadOutcome::Applied {
            batch_id,
            report,
            indexed,
        })
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Markers for the viewport, computed on the live index.
    pub fn on_viewport(&self, viewport: &Viewport) -> Result<MarkerSet> {
        let index = self.index();
        let markers = index.clusters(&viewport.bbox, viewport.zoom)?;
        Ok(MarkerSet::new(viewport.zoom, markers))
    }

    /// Set or clear the selected play, returning its reach overlay.
    pub fn select_play(&self, selection: Option<PlaySelection>) -> Vec<ReachPolygon> {
        let mut state = self.state.write();
        let reach = match &selection {
            Some(s) => self.reach.build_for_play(&state.locations, s),
            None => Vec::new(),
        };
        state.reach = reach.clone();
        state.selection = selection;
        reach
    }

    pub fn selection(&self) -> Option<PlaySelection> {
        self.state.read().selection.clone()
    }

    pub fn reach_polygons(&self) -> Vec<ReachPolygon> {
        self.state.read().reach.clone()
    }

    /// Where to move the camera when a cluster marker is clicked.
    ///
    /// `None` when the key does not resolve in the live index; keys from a
    /// replaced index should not be reused.
    pub fn cluster_click(&self, key: ClusterKey) -> Option<FlyTo> {
        let index = self.index();
        let zoom = index.expansion_zoom(key)?;
        let center = index.cluster(key)?.center();
        Some(FlyTo { center, zoom })
    }

    pub fn leaf_click(&self, id: &str) -> Option<Location> {
        let state = self.state.read();
        let i = *state.by_id.get(id)?;
        state.locations.get(i).cloned()
    }

    /// Bounds of every geocoded location, for the initial camera.
    pub fn fit_bounds(&self) -> Option<BoundingBox> {
        let state = self.state.read();
        let coords: Vec<Coordinates> = state
            .locations
            .iter()
            .filter_map(Location::valid_coordinates)
            .collect();
        BoundingBox::from_coordinates(&coords)
    }

    /// Geocoded locations inside a drawn territory.
    pub fn locations_in_territory(&self, territory: &geo::Polygon<f64>) -> Vec<Location> {
        let state = self.state.read();
        state
            .locations
            .iter()
            .filter(|loc| {
                loc.valid_coordinates()
                    .is_some_and(|c| territory.contains(&c.to_point()))
            })
            .cloned()
            .collect()
    }

    pub fn locations(&self) -> Vec<Location> {
        self.state.read().locations.clone()
    }

    /// The live cluster index.
    pub fn index(&self) -> Arc<SpatialIndex> {
        Arc::clone(&self.state.read().index)
    }

    /// Cancel the running batch and refuse new ones.
    pub fn shutdown(&self) {
        log::info!("Shutting down map engine");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeocoderConfig;
    use geo::polygon;
    use crate::geocode::testing::{Reply, ScriptedProvider};
    use reachmap_types::cluster::Cluster;
    use std::time::Duration;

    fn engine(provider: ScriptedProvider) -> MapEngine<ScriptedProvider> {
        let config = EngineConfig::default().with_geocoder(
            GeocoderConfig::default().with_request_interval(Duration::ZERO),
        );
        MapEngine::new(provider, config).unwrap()
    }

    fn cities() -> Vec<Location> {
        vec![
            Location::new("phx-1", "1 Van Buren", "Phoenix", "AZ"),
            Location::new("phx-2", "2 Van Buren", "Phoenix", "AZ"),
            Location::new("chi-1", "1 Wacker", "Chicago", "IL"),
            Location::new("lost", "5 Elm", "Nowhere Town", "ZZ"),
        ]
    }

    #[tokio::test]
    async fn test_load_and_query() {
        let engine = engine(ScriptedProvider::new());
        let outcome = engine.load_locations(cities()).await.unwrap();
        match outcome {
            LoadOutcome::Applied {
                report, indexed, ..
            } => {
                assert_eq!(indexed, 3);
                assert_eq!(report.unresolved, 1);
            }
            other => panic!("unexpected {:?}", other),
        }

        let markers = engine
            .on_viewport(&Viewport::new(BoundingBox::world(), 3))
            .unwrap();
        assert_eq!(markers.total_points(), 3);
        // The two Phoenix stores share a center and merge.
        assert_eq!(markers.len(), 2);

        let lost = engine.leaf_click("lost").unwrap();
        assert!(lost.coordinates.is_none());
        assert!(engine.leaf_click("missing").is_none());
    }

    #[tokio::test]
    async fn test_cluster_click_flies_to_expansion() {
        let engine = engine(ScriptedProvider::new());
        engine.load_locations(cities()).await.unwrap();

        let markers = engine
            .on_viewport(&Viewport::new(BoundingBox::world(), 3))
            .unwrap();
        let key = markers.markers.iter().find_map(Cluster::key).unwrap();
        let fly = engine.cluster_click(key).unwrap();
        assert!(fly.zoom > 3);
        assert!((fly.center.lng() - -112.0740).abs() < 1e-9);
        assert!((fly.center.lat() - 33.4484).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_reach_follows_selection_and_batches() {
        let engine = engine(ScriptedProvider::new());
        assert!(engine
            .select_play(Some(PlaySelection::new("p1", 2_000.0)))
            .is_empty());

        engine.load_locations(cities()).await.unwrap();
        let reach = engine.reach_polygons();
        assert_eq!(reach.len(), 3);
        assert!(reach.iter().all(|p| p.radius_km == 20.0 && p.is_closed()));

        assert!(engine.select_play(None).is_empty());
        assert!(engine.reach_polygons().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_batch_is_discarded() {
        let provider = ScriptedProvider::new()
            .with_delay(Duration::from_secs(5))
            .reply(
                "9 Slow Rd, Flagstaff, AZ",
                vec![Reply::Found(vec![Coordinates::new(-111.65, 35.2)])],
            );
        let engine = Arc::new(engine(provider));

        let slow = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .load_locations(vec![Location::new("slow", "9 Slow Rd", "Flagstaff", "AZ")])
                    .await
            })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let fast = engine
            .load_locations(vec![Location::new("fast", "1 Wacker", "Chicago", "IL")])
            .await
            .unwrap();
        assert!(fast.is_applied());

        let slow = slow.await.unwrap().unwrap();
        assert!(matches!(slow, LoadOutcome::Superseded { .. }));

        assert!(engine.leaf_click("fast").is_some());
        assert!(engine.leaf_click("slow").is_none());
        assert_eq!(engine.index().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_loads_apply_latest() {
        let engine = Arc::new(engine(ScriptedProvider::new()));

        for round in 0..50 {
            let batches: Vec<Vec<Location>> = (0..2)
                .map(|b| {
                    vec![Location::new(
                        format!("r{}-b{}", round, b),
                        "1 Main St",
                        if b == 0 { "Denver" } else { "Boston" },
                        "US",
                    )]
                })
                .collect();
            let handles: Vec<_> = batches
                .into_iter()
                .map(|batch| {
                    let engine = Arc::clone(&engine);
                    tokio::spawn(async move { engine.load_locations(batch).await })
                })
                .collect();

            let mut applied = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(LoadOutcome::Applied { .. }) => applied += 1,
                    Ok(LoadOutcome::Superseded { .. }) => {}
                    Err(e) => panic!("round {}: latest batch failed: {}", round, e),
                }
            }
            assert!(applied >= 1, "round {}: no batch applied", round);

            let live = engine.locations();
            assert_eq!(live.len(), 1);
            assert!(live[0].id.starts_with(&format!("r{}-", round)));
            assert_eq!(engine.index().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_shutdown_refuses_batches() {
        let engine = engine(ScriptedProvider::new());
        engine.shutdown();
        assert!(engine.is_shut_down());
        assert!(matches!(
            engine.load_locations(cities()).await,
            Err(ReachMapError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_fit_bounds_and_territory() {
        let engine = engine(ScriptedProvider::new());
        assert!(engine.fit_bounds().is_none());
        engine.load_locations(cities()).await.unwrap();

        let bounds = engine.fit_bounds().unwrap();
        assert_eq!(bounds.west, -112.0740);
        assert_eq!(bounds.east, -87.6298);

        let arizona = geo::polygon![
            (x: -115.0, y: 31.0),
            (x: -109.0, y: 31.0),
            (x: -109.0, y: 37.0),
            (x: -115.0, y: 37.0),
            (x: -115.0, y: 31.0),
        ];
        let inside: Vec<String> = engine
            .locations_in_territory(&arizona)
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(inside, vec!["phx-1", "phx-2"]);
    }
}

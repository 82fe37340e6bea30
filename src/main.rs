use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use reachmap::compute::geojson::{
    markers_to_feature_collection, reach_to_feature_collection, to_geojson_string,
};
use reachmap::{
    BatchGeocoder, BoundingBox, EngineConfig, GeocodeClient, GeocodeProvider, Location,
    MapboxGeocoder, MarkerSet, OfflineProvider, PlaySelection, ReachGeometryBuilder, SpatialIndex,
    Viewport,
};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Geocode store locations and render clusters and reach overlays as GeoJSON
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (.json or .toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve coordinates for a JSON array of locations
    Geocode {
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the geocoded list; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use only the built-in city table, no remote lookups
        #[arg(long)]
        offline: bool,

        /// Override the configured number of lookups in flight
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Print the markers visible in a viewport
    Clusters {
        #[arg(short, long)]
        input: PathBuf,

        /// Viewport as west,south,east,north
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: Option<BoundingBox>,

        /// Map zoom; fractional values are floored
        #[arg(short, long, default_value_t = 4.0)]
        zoom: f64,
    },

    /// Print reach polygons for every geocoded location
    Reach {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        audience: f64,

        #[arg(long, default_value = "play")]
        play: String,

        /// Border color of the play
        #[arg(long, requires = "secondary")]
        primary: Option<String>,

        /// Fill color of the play
        #[arg(long, requires = "primary")]
        secondary: Option<String>,
    },
}

fn parse_bbox(value: &str) -> std::result::Result<BoundingBox, String> {
    let edges: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| format!("invalid number in bbox: {}", e))?;
    match edges.as_slice() {
        &[west, south, east, north] => Ok(BoundingBox::new(west, south, east, north)),
        _ => Err(format!("expected 4 comma-separated values, got {}", edges.len())),
    }
}

fn init_logging() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_module_path(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    Ok(config)
}

fn read_locations(path: &Path) -> Result<Vec<Location>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse locations in {}", path.display()))
}

async fn geocode_with<P: GeocodeProvider>(
    provider: P,
    config: &EngineConfig,
    locations: Vec<Location>,
) -> Result<Vec<Location>> {
    let client = GeocodeClient::new(provider, config.geocoder.clone())?;
    let batch = BatchGeocoder::new(client);
    let (located, report) = batch
        .resolve_with_report(locations, &CancellationToken::new())
        .await?;
    log::info!(
        "{} of {} locations have coordinates",
        report.located(),
        report.total
    );
    Ok(located)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Geocode {
            input,
            output,
            offline,
            concurrency,
        } => {
            if let Some(n) = concurrency {
                if n == 0 {
                    bail!("--concurrency must be at least 1");
                }
                config.geocoder = config.geocoder.with_concurrency(n);
            }
            let locations = read_locations(&input)?;

            let located = if offline {
                geocode_with(OfflineProvider, &config, locations).await?
            } else {
                config.geocoder = config.geocoder.with_access_token_from_env();
                let provider = MapboxGeocoder::new(&config.geocoder)?;
                geocode_with(provider, &config, locations).await?
            };

            let json = serde_json::to_string_pretty(&located)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    log::info!("Geocoded locations written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Clusters { input, bbox, zoom } => {
            let locations = read_locations(&input)?;
            let index = SpatialIndex::from_locations(&locations, config.cluster.clone())?;
            let viewport =
                Viewport::from_fractional_zoom(bbox.unwrap_or(BoundingBox::world()), zoom);

            let markers =
                MarkerSet::new(viewport.zoom, index.clusters(&viewport.bbox, viewport.zoom)?);
            log::info!(
                "{} markers covering {} of {} points at zoom {}",
                markers.len(),
                markers.total_points(),
                index.len(),
                viewport.zoom
            );
            println!(
                "{}",
                to_geojson_string(markers_to_feature_collection(&markers))?
            );
        }
        Command::Reach {
            input,
            audience,
            play,
            primary,
            secondary,
        } => {
            let locations = read_locations(&input)?;
            let builder = ReachGeometryBuilder::new(config.reach.clone())?;
            let mut selection = PlaySelection::new(play, audience);
            if let (Some(primary), Some(secondary)) = (primary, secondary) {
                selection = selection.with_colors(primary, secondary);
            }

            let polygons = builder.build_for_play(&locations, &selection);
            log::info!(
                "Built {} reach polygons with radius {} km",
                polygons.len(),
                builder.radius_for_audience(audience)
            );
            println!(
                "{}",
                to_geojson_string(reach_to_feature_collection(&polygons))?
            );
        }
    }

    Ok(())
}

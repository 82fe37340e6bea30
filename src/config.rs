//! Engine configuration.
//!
//! Every tuning constant of the engine lives here and is passed to
//! constructors explicitly; nothing is read from global state. The
//! configuration loads from JSON, or TOML with the `toml` feature.
//!
//! ```rust
//! use reachmap::EngineConfig;
//!
//! let json = r#"{
//!     "geocoder": { "request_interval_ms": 250, "concurrency": 2 },
//!     "cluster": { "radius": 60 }
//! }"#;
//! let config = EngineConfig::from_json(json).unwrap();
//! assert_eq!(config.cluster.radius, 60.0);
//! assert_eq!(config.cluster.max_zoom, 16);
//! assert_eq!(config.reach.vertex_count, 64);
//! ```

use crate::error::{ReachMapError, Result};
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable consulted for the geocoding access token.
pub const ACCESS_TOKEN_ENV: &str = "MAPBOX_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub geocoder: GeocoderConfig,

    #[serde(default)]
    pub cluster: ClusterOptions,

    #[serde(default)]
    pub reach: ReachOptions,
}

/// Remote geocoding, retry and pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeocoderConfig {
    #[serde(default = "GeocoderConfig::default_base_url")]
    pub base_url: String,

    /// Service access token. Falls back to `MAPBOX_TOKEN` via
    /// [`GeocoderConfig::with_access_token_from_env`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default = "GeocoderConfig::default_country")]
    pub country: String,

    /// Candidates requested per lookup; only the first is used.
    #[serde(default = "GeocoderConfig::default_result_limit")]
    pub result_limit: u32,

    /// Total attempts per address, including the first.
    #[serde(default = "GeocoderConfig::default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubled for each further retry.
    #[serde(default = "GeocoderConfig::default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Minimum spacing between remote requests. 0 disables pacing.
    #[serde(default = "GeocoderConfig::default_request_interval_ms")]
    pub request_interval_ms: u64,

    /// Maximum lookups in flight in a batch.
    #[serde(default = "GeocoderConfig::default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "GeocoderConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GeocoderConfig {
    fn default_base_url() -> String {
        "https://api.mapbox.com".to_string()
    }

    fn default_country() -> String {
        "us".to_string()
    }

    const fn default_result_limit() -> u32 {
        1
    }

    const fn default_max_attempts() -> u32 {
        3
    }

    const fn default_backoff_base_ms() -> u64 {
        1000
    }

    const fn default_request_interval_ms() -> u64 {
        500
    }

    const fn default_concurrency() -> usize {
        1
    }

    const fn default_timeout_secs() -> u64 {
        15
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Fill `access_token` from `MAPBOX_TOKEN` when it is not set already.
    pub fn with_access_token_from_env(mut self) -> Self {
        if self.access_token.is_none() {
            self.access_token = std::env::var(ACCESS_TOKEN_ENV).ok();
        }
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        assert!(attempts > 0, "Max attempts must be greater than zero");
        self.max_attempts = attempts;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base_ms = base.as_millis() as u64;
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        assert!(concurrency > 0, "Concurrency must be greater than zero");
        if concurrency > 16 {
            log::warn!(
                "Geocoding concurrency of {} is high; requests are still paced at one per {} ms",
                concurrency,
                self.request_interval_ms
            );
        }
        self.concurrency = concurrency;
        self
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay slept after failed attempt number `attempt` (0-based).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_attempts == 0 {
            return Err("Max attempts must be greater than zero".to_string());
        }
        if self.concurrency == 0 {
            return Err("Concurrency must be greater than zero".to_string());
        }
        if self.result_limit == 0 {
            return Err("Result limit must be greater than zero".to_string());
        }
        if self.base_url.trim().is_empty() {
            return Err("Base URL must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            access_token: None,
            country: Self::default_country(),
            result_limit: Self::default_result_limit(),
            max_attempts: Self::default_max_attempts(),
            backoff_base_ms: Self::default_backoff_base_ms(),
            request_interval_ms: Self::default_request_interval_ms(),
            concurrency: Self::default_concurrency(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

/// Clustering parameters.
///
/// `radius` is in screen pixels relative to a tile of `extent` pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterOptions {
    #[serde(default = "ClusterOptions::default_radius")]
    pub radius: f64,

    #[serde(default = "ClusterOptions::default_extent")]
    pub extent: f64,

    #[serde(default)]
    pub min_zoom: u8,

    #[serde(default = "ClusterOptions::default_max_zoom")]
    pub max_zoom: u8,

    /// Minimum number of points needed to form a cluster.
    #[serde(default = "ClusterOptions::default_min_points")]
    pub min_points: usize,
}

impl ClusterOptions {
    const fn default_radius() -> f64 {
        40.0
    }

    const fn default_extent() -> f64 {
        512.0
    }

    const fn default_max_zoom() -> u8 {
        16
    }

    const fn default_min_points() -> usize {
        2
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(format!("Cluster radius must be positive, got: {}", self.radius));
        }
        if !self.extent.is_finite() || self.extent <= 0.0 {
            return Err(format!("Tile extent must be positive, got: {}", self.extent));
        }
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom ({}) must be <= max_zoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }
        if self.max_zoom > 30 {
            return Err(format!("max_zoom must be <= 30, got: {}", self.max_zoom));
        }
        if self.min_points < 2 {
            return Err("min_points must be at least 2".to_string());
        }
        Ok(())
    }
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius: Self::default_radius(),
            extent: Self::default_extent(),
            min_zoom: 0,
            max_zoom: Self::default_max_zoom(),
            min_points: Self::default_min_points(),
        }
    }
}

/// Reach circle sizing and styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReachOptions {
    #[serde(default = "ReachOptions::default_vertex_count")]
    pub vertex_count: usize,

    /// Audience units per kilometre of radius.
    #[serde(default = "ReachOptions::default_audience_divisor")]
    pub audience_divisor: f64,

    #[serde(default = "ReachOptions::default_min_radius_km")]
    pub min_radius_km: f64,

    #[serde(default = "ReachOptions::default_max_radius_km")]
    pub max_radius_km: f64,

    #[serde(default = "ReachOptions::default_km_per_degree")]
    pub km_per_degree: f64,

    #[serde(default = "ReachOptions::default_fill_color")]
    pub default_fill_color: String,

    #[serde(default = "ReachOptions::default_border_color")]
    pub default_border_color: String,
}

impl ReachOptions {
    const fn default_vertex_count() -> usize {
        64
    }

    const fn default_audience_divisor() -> f64 {
        100.0
    }

    const fn default_min_radius_km() -> f64 {
        5.0
    }

    const fn default_max_radius_km() -> f64 {
        50.0
    }

    const fn default_km_per_degree() -> f64 {
        111.0
    }

    fn default_fill_color() -> String {
        "#4F46E5".to_string()
    }

    fn default_border_color() -> String {
        "#4338CA".to_string()
    }

    pub fn with_vertex_count(mut self, vertex_count: usize) -> Self {
        assert!(vertex_count >= 3, "A ring needs at least 3 vertices");
        self.vertex_count = vertex_count;
        self
    }

    pub fn with_radius_range(mut self, min_km: f64, max_km: f64) -> Self {
        self.min_radius_km = min_km;
        self.max_radius_km = max_km;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.vertex_count < 3 {
            return Err(format!(
                "vertex_count must be at least 3, got: {}",
                self.vertex_count
            ));
        }
        if !self.audience_divisor.is_finite() || self.audience_divisor <= 0.0 {
            return Err("audience_divisor must be positive".to_string());
        }
        if !self.km_per_degree.is_finite() || self.km_per_degree <= 0.0 {
            return Err("km_per_degree must be positive".to_string());
        }
        if !(self.min_radius_km.is_finite() && self.max_radius_km.is_finite()) {
            return Err("Radius bounds must be finite".to_string());
        }
        if self.min_radius_km <= 0.0 || self.min_radius_km > self.max_radius_km {
            return Err(format!(
                "Radius range must satisfy 0 < min ({}) <= max ({})",
                self.min_radius_km, self.max_radius_km
            ));
        }
        Ok(())
    }
}

impl Default for ReachOptions {
    fn default() -> Self {
        Self {
            vertex_count: Self::default_vertex_count(),
            audience_divisor: Self::default_audience_divisor(),
            min_radius_km: Self::default_min_radius_km(),
            max_radius_km: Self::default_max_radius_km(),
            km_per_degree: Self::default_km_per_degree(),
            default_fill_color: Self::default_fill_color(),
            default_border_color: Self::default_border_color(),
        }
    }
}

impl EngineConfig {
    pub fn with_geocoder(mut self, geocoder: GeocoderConfig) -> Self {
        self.geocoder = geocoder;
        self
    }

    pub fn with_cluster(mut self, cluster: ClusterOptions) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_reach(mut self, reach: ReachOptions) -> Self {
        self.reach = reach;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.geocoder.validate()?;
        self.cluster.validate()?;
        self.reach.validate()?;
        Ok(())
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: EngineConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: EngineConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load a configuration file, picking the format from its extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::from_json(&text)?),
            #[cfg(feature = "toml")]
            Some("toml") => {
                Self::from_toml(&text).map_err(|e| ReachMapError::InvalidConfig(e.to_string()))
            }
            other => Err(ReachMapError::InvalidConfig(format!(
                "Unsupported config format: {:?}",
                other.unwrap_or("")
            ))),
        }
    }
}

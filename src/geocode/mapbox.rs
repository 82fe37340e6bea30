//! Mapbox forward-geocoding backend.

use super::error::GeocodeError;
use super::provider::GeocodeProvider;
use crate::config::GeocoderConfig;
use crate::error::{ReachMapError, Result};
use reachmap_types::coords::Coordinates;
use reqwest::{Client, Url};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(Debug, Deserialize)]
struct PlaceFeature {
    center: Option<[f64; 2]>,
}

/// Candidate centers from a places response, best match first.
pub(crate) fn parse_places(body: &str) -> std::result::Result<Vec<Coordinates>, GeocodeError> {
    let response: PlacesResponse = serde_json::from_str(body)?;
    Ok(response
        .features
        .into_iter()
        .filter_map(|f| f.center.map(Coordinates::from))
        .collect())
}

pub struct MapboxGeocoder {
    client: Client,
    base_url: Url,
    access_token: String,
    country: String,
    limit: u32,
}

impl MapboxGeocoder {
    /// Requires `access_token` to be set on the config.
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let access_token = config.access_token.clone().ok_or_else(|| {
            ReachMapError::InvalidConfig(format!(
                "Geocoding access token missing; set geocoder.access_token or {}",
                crate::config::ACCESS_TOKEN_ENV
            ))
        })?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ReachMapError::InvalidConfig(format!("Invalid base URL {}: {}", config.base_url, e))
        })?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(GeocodeError::from)?;

        Ok(Self {
            client,
            base_url,
            access_token,
            country: config.country.clone(),
            limit: config.result_limit,
        })
    }

    pub(crate) fn request_url(&self, query: &str) -> std::result::Result<Url, GeocodeError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                GeocodeError::InvalidRequest(format!(
                    "Base URL {} cannot have a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["geocoding", "v5", "mapbox.places", format!("{}.json", query).as_str()]);
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token)
            .append_pair("country", &self.country)
            .append_pair("limit", &self.limit.to_string());
        Ok(url)
    }
}

impl std::fmt::Debug for MapboxGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapboxGeocoder")
            .field("base_url", &self.base_url.as_str())
            .field("country", &self.country)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl GeocodeProvider for MapboxGeocoder {
    async fn lookup(&self, query: &str) -> std::result::Result<Vec<Coordinates>, GeocodeError> {
        let url = self.request_url(query)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GeocodeError::from_status(status.as_u16(), &body));
        }
        parse_places(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_places() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [
                {"place_name": "Phoenix, Arizona", "center": [-112.074, 33.4484]},
                {"place_name": "no center"},
                {"center": [-111.9, 33.5]}
            ]
        }"#;
        let candidates = parse_places(body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], Coordinates::new(-112.074, 33.4484));

        assert!(parse_places(r#"{"type":"FeatureCollection"}"#).unwrap().is_empty());
        assert!(matches!(
            parse_places("<html>"),
            Err(GeocodeError::Decode(_))
        ));
    }

    #[test]
    fn test_request_url_encodes_query() {
        let config = GeocoderConfig::default()
            .with_base_url("https://geo.example.com/")
            .with_access_token("tok");
        let geocoder = MapboxGeocoder::new(&config).unwrap();
        let url = geocoder.request_url("12 Elm St #4, Tampa, FL").unwrap();

        assert_eq!(url.host_str(), Some("geo.example.com"));
        assert!(url.path().starts_with("/geocoding/v5/mapbox.places/12%20Elm%20St%20%234"));
        assert!(url.path().ends_with(".json"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("access_token".into(), "tok".into())));
        assert!(pairs.contains(&("country".into(), "us".into())));
        assert!(pairs.contains(&("limit".into(), "1".into())));
    }

    #[test]
    fn test_missing_token_rejected() {
        let config = GeocoderConfig {
            access_token: None,
            ..GeocoderConfig::default()
        };
        assert!(matches!(
            MapboxGeocoder::new(&config),
            Err(ReachMapError::InvalidConfig(_))
        ));
    }
}

//! GeoJSON conversion for marker sets and reach polygons.
//!
//! Feature properties match what map layers consume: markers carry
//! `cluster`, `point_count`, `cluster_id`, `locationId` and `locationName`;
//! reach features carry `locationId`, `locationName`, `audienceSize`,
//! `radius`, `fillColor` and `borderColor`.

use crate::error::{ReachMapError, Result};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use reachmap_types::cluster::{Cluster, MarkerSet};
use reachmap_types::coords::Coordinates;
use reachmap_types::reach::ReachPolygon;
use serde_json::json;

fn position(c: &Coordinates) -> Vec<f64> {
    vec![c.lng(), c.lat()]
}

fn feature(geometry: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Converts one marker to a Point feature.
pub fn marker_to_feature(marker: &Cluster) -> Feature {
    let mut props = JsonObject::new();
    match marker {
        Cluster::Leaf(point) => {
            props.insert("cluster".into(), json!(false));
            props.insert("locationId".into(), json!(point.id));
            if let Some(name) = &point.name {
                props.insert("locationName".into(), json!(name));
            }
        }
        Cluster::Aggregate {
            key, point_count, ..
        } => {
            props.insert("cluster".into(), json!(true));
            props.insert("cluster_id".into(), json!(key.to_string()));
            props.insert("point_count".into(), json!(point_count));
        }
    }
    feature(Value::Point(position(&marker.center())), props)
}

pub fn markers_to_feature_collection(markers: &MarkerSet) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: markers.markers.iter().map(marker_to_feature).collect(),
        foreign_members: None,
    }
}

/// Converts one reach polygon to a Polygon feature.
pub fn reach_to_feature(polygon: &ReachPolygon) -> Feature {
    let ring: Vec<Vec<f64>> = polygon.ring.iter().map(position).collect();

    let mut props = JsonObject::new();
    props.insert("locationId".into(), json!(polygon.location_id));
    props.insert("locationName".into(), json!(polygon.location_name));
    props.insert("audienceSize".into(), json!(polygon.audience_size));
    props.insert("radius".into(), json!(polygon.radius_km));
    props.insert("fillColor".into(), json!(polygon.style.fill_color));
    props.insert("borderColor".into(), json!(polygon.style.border_color));

    feature(Value::Polygon(vec![ring]), props)
}

pub fn reach_to_feature_collection(polygons: &[ReachPolygon]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: polygons.iter().map(reach_to_feature).collect(),
        foreign_members: None,
    }
}

/// Serializes a feature collection to a GeoJSON string.
pub fn to_geojson_string(collection: FeatureCollection) -> Result<String> {
    serde_json::to_string(&GeoJson::FeatureCollection(collection))
        .map_err(|e| ReachMapError::Other(format!("Failed to serialize GeoJSON: {}", e)))
}

/// Parses a drawn territory (a Polygon geometry or a Feature wrapping one).
pub fn territory_from_geojson(geojson: &str) -> Result<geo::Polygon<f64>> {
    let parsed: GeoJson = geojson
        .parse()
        .map_err(|e| ReachMapError::InvalidInput(format!("Failed to parse GeoJSON: {}", e)))?;

    let geometry = match parsed {
        GeoJson::Geometry(g) => g,
        GeoJson::Feature(f) => f.geometry.ok_or_else(|| {
            ReachMapError::InvalidInput("Territory feature has no geometry".to_string())
        })?,
        GeoJson::FeatureCollection(_) => {
            return Err(ReachMapError::InvalidInput(
                "Expected a single territory, got a FeatureCollection".to_string(),
            ));
        }
    };

    match geometry.value {
        Value::Polygon(_) => geo::Polygon::<f64>::try_from(geometry.value)
            .map_err(|e| ReachMapError::InvalidInput(format!("Invalid territory polygon: {}", e))),
        _ => Err(ReachMapError::InvalidInput(
            "Territory geometry is not a Polygon".to_string(),
        )),
    }
}

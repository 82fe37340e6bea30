//! Validation for coordinates, viewports and reach inputs.

use crate::error::{ReachMapError, Result};
use reachmap_types::bbox::BoundingBox;
use reachmap_types::coords::Coordinates;
use reachmap_types::location::Location;

/// Validates a longitude/latitude pair.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use reachmap::compute::validation::validate_coordinates;
/// use reachmap::Coordinates;
///
/// assert!(validate_coordinates(&Coordinates::new(-74.0060, 40.7128)).is_ok());
/// assert!(validate_coordinates(&Coordinates::new(200.0, 40.0)).is_err());
/// assert!(validate_coordinates(&Coordinates::new(-74.0, 95.0)).is_err());
/// ```
pub fn validate_coordinates(c: &Coordinates) -> Result<()> {
    let (lng, lat) = (c.lng(), c.lat());

    if !lng.is_finite() {
        return Err(ReachMapError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            lng
        )));
    }

    if !lat.is_finite() {
        return Err(ReachMapError::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            lat
        )));
    }

    if !(-180.0..=180.0).contains(&lng) {
        return Err(ReachMapError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            lng
        )));
    }

    if !(-90.0..=90.0).contains(&lat) {
        return Err(ReachMapError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            lat
        )));
    }

    Ok(())
}

/// Validates the coordinates carried by a location, if any.
pub fn validate_location(location: &Location) -> Result<()> {
    match &location.coordinates {
        Some(c) => validate_coordinates(c).map_err(|e| {
            ReachMapError::InvalidInput(format!("Location {}: {}", location.id, e))
        }),
        None => Ok(()),
    }
}

/// Validates a viewport bounding box.
///
/// Edges must be finite and `south <= north`. `west > east` is allowed and
/// means the box crosses the antimeridian; longitudes outside [-180, 180]
/// are wrapped by the query rather than rejected.
///
/// ```
/// use reachmap::compute::validation::validate_bbox;
/// use reachmap::BoundingBox;
///
/// assert!(validate_bbox(&BoundingBox::new(-10.0, -10.0, 10.0, 10.0)).is_ok());
/// assert!(validate_bbox(&BoundingBox::new(170.0, -10.0, -170.0, 10.0)).is_ok());
/// assert!(validate_bbox(&BoundingBox::new(-10.0, 10.0, 10.0, -10.0)).is_err());
/// ```
pub fn validate_bbox(bbox: &BoundingBox) -> Result<()> {
    let edges = [bbox.west, bbox.south, bbox.east, bbox.north];
    if edges.iter().any(|v| !v.is_finite()) {
        return Err(ReachMapError::InvalidInput(format!(
            "Bounding box edges must be finite, got: {:?}",
            edges
        )));
    }

    if bbox.south > bbox.north {
        return Err(ReachMapError::InvalidInput(format!(
            "south ({}) must be <= north ({})",
            bbox.south, bbox.north
        )));
    }

    Ok(())
}

/// Validates a reach radius in kilometres.
pub fn validate_radius_km(radius_km: f64) -> Result<()> {
    if !radius_km.is_finite() {
        return Err(ReachMapError::InvalidInput(format!(
            "Radius must be finite, got: {}",
            radius_km
        )));
    }
    if radius_km <= 0.0 {
        return Err(ReachMapError::InvalidInput(format!(
            "Radius must be positive, got: {}",
            radius_km
        )));
    }
    const EARTH_CIRCUMFERENCE_KM: f64 = 40_075.0;
    if radius_km > EARTH_CIRCUMFERENCE_KM {
        return Err(ReachMapError::InvalidInput(format!(
            "Radius {} exceeds Earth's circumference ({} km)",
            radius_km, EARTH_CIRCUMFERENCE_KM
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coordinates() {
        let phoenix = Coordinates::new(-112.0740, 33.4484);
        assert!(validate_coordinates(&phoenix).is_ok());

        // Edge cases
        assert!(validate_coordinates(&Coordinates::new(180.0, 0.0)).is_ok());
        assert!(validate_coordinates(&Coordinates::new(-180.0, 0.0)).is_ok());
        assert!(validate_coordinates(&Coordinates::new(0.0, 90.0)).is_ok());
        assert!(validate_coordinates(&Coordinates::new(0.0, -90.0)).is_ok());
    }

    #[test]
    fn test_invalid_coordinates() {
        assert!(validate_coordinates(&Coordinates::new(f64::NAN, 0.0)).is_err());
        assert!(validate_coordinates(&Coordinates::new(0.0, f64::NEG_INFINITY)).is_err());
        assert!(validate_coordinates(&Coordinates::new(180.001, 0.0)).is_err());
        assert!(validate_coordinates(&Coordinates::new(0.0, 90.5)).is_err());
    }

    #[test]
    fn test_validate_location_reports_id() {
        let mut loc = Location::new("store-9", "1 Main", "Tampa", "FL");
        assert!(validate_location(&loc).is_ok());

        loc.coordinates = Some(Coordinates::new(0.0, 120.0));
        let err = validate_location(&loc).unwrap_err().to_string();
        assert!(err.contains("store-9"));
    }

    #[test]
    fn test_validate_radius() {
        assert!(validate_radius_km(5.0).is_ok());
        assert!(validate_radius_km(0.0).is_err());
        assert!(validate_radius_km(-1.0).is_err());
        assert!(validate_radius_km(f64::NAN).is_err());
        assert!(validate_radius_km(50_000.0).is_err());
    }

    #[test]
    fn test_bbox_rejects_nan() {
        assert!(validate_bbox(&BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0)).is_err());
    }
}

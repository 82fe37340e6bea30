use serde::{Deserialize, Serialize};

/// A longitude/latitude pair in degrees.
///
/// Serialized as a two-element `[lng, lat]` array, the order used by
/// GeoJSON and by the geocoding service.
///
/// # Examples
///
/// ```
/// use reachmap_types::coords::Coordinates;
///
/// let denver = Coordinates::new(-104.9903, 39.7392);
/// assert_eq!(denver.lng(), -104.9903);
/// assert!(denver.is_valid());
///
/// let json = serde_json::to_string(&denver).unwrap();
/// assert_eq!(json, "[-104.9903,39.7392]");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinates {
    lng: f64,
    lat: f64,
}

impl Coordinates {
    #[inline]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Longitude in degrees.
    #[inline]
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in degrees.
    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// True when both components are finite and inside
    /// lng [-180, 180] and lat [-90, 90].
    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }

    pub fn to_point(&self) -> geo::Point<f64> {
        geo::Point::new(self.lng, self.lat)
    }

    pub fn to_coord(&self) -> geo::Coord<f64> {
        geo::coord! { x: self.lng, y: self.lat }
    }
}

impl From<[f64; 2]> for Coordinates {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(c: Coordinates) -> Self {
        [c.lng, c.lat]
    }
}

impl From<(f64, f64)> for Coordinates {
    fn from((lng, lat): (f64, f64)) -> Self {
        Self { lng, lat }
    }
}

impl From<geo::Point<f64>> for Coordinates {
    fn from(p: geo::Point<f64>) -> Self {
        Self::new(p.x(), p.y())
    }
}

impl From<geo::Coord<f64>> for Coordinates {
    fn from(c: geo::Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

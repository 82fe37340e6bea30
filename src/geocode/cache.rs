//! Local city lookup used before any remote request.

use once_cell::sync::Lazy;
use reachmap_types::coords::Coordinates;
use rustc_hash::FxHashMap;

/// Seed entries, keyed by uppercased city name.
static METRO_AREAS: Lazy<FxHashMap<&'static str, Coordinates>> = Lazy::new(|| {
    [
        ("ALBUQUERQUE", -106.6504, 35.0844),
        ("PHOENIX", -112.0740, 33.4484),
        ("LOS ANGELES", -118.2437, 34.0522),
        ("CHICAGO", -87.6298, 41.8781),
        ("HOUSTON", -95.3698, 29.7604),
        ("DALLAS", -96.7970, 32.7767),
        ("MIAMI", -80.1918, 25.7617),
        ("NEW YORK", -74.0060, 40.7128),
        ("DENVER", -104.9903, 39.7392),
        ("SEATTLE", -122.3321, 47.6062),
        ("SAN FRANCISCO", -122.4194, 37.7749),
        ("ATLANTA", -84.3880, 33.7490),
        ("BOSTON", -71.0589, 42.3601),
        ("DETROIT", -83.0458, 42.3314),
        ("MINNEAPOLIS", -93.2650, 44.9778),
        ("PORTLAND", -122.6765, 45.5231),
        ("SACRAMENTO", -121.4944, 38.5816),
        ("SALT LAKE CITY", -111.8910, 40.7608),
        ("SAN DIEGO", -117.1611, 32.7157),
        ("TAMPA", -82.4572, 27.9506),
    ]
    .into_iter()
    .map(|(city, lng, lat)| (city, Coordinates::new(lng, lat)))
    .collect()
});

/// City name to coordinate table.
///
/// Lookups are case-insensitive and ignore surrounding whitespace. A hit
/// resolves the whole address to the city center.
#[derive(Debug, Clone)]
pub struct CoordinateCache {
    entries: FxHashMap<String, Coordinates>,
}

impl CoordinateCache {
    /// Cache seeded with the built-in metro areas.
    pub fn new() -> Self {
        let entries = METRO_AREAS
            .iter()
            .map(|(city, c)| (city.to_string(), *c))
            .collect();
        Self { entries }
    }

    pub fn empty() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    fn normalize(city: &str) -> String {
        city.trim().to_uppercase()
    }

    pub fn lookup(&self, city: &str) -> Option<Coordinates> {
        self.entries.get(&Self::normalize(city)).copied()
    }

    /// Add or replace an entry. Invalid coordinates are ignored.
    pub fn insert(&mut self, city: &str, coordinates: Coordinates) -> bool {
        if !coordinates.is_valid() {
            log::warn!("Ignoring cache entry for {}: invalid coordinates", city);
            return false;
        }
        self.entries.insert(Self::normalize(city), coordinates);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CoordinateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_lookup_is_normalized() {
        let cache = CoordinateCache::new();
        assert_eq!(cache.len(), 20);
        assert_eq!(
            cache.lookup("  phoenix "),
            Some(Coordinates::new(-112.0740, 33.4484))
        );
        assert_eq!(
            cache.lookup("Salt Lake City"),
            Some(Coordinates::new(-111.8910, 40.7608))
        );
        assert_eq!(cache.lookup("Nowhere Town"), None);
    }

    #[test]
    fn test_insert() {
        let mut cache = CoordinateCache::empty();
        assert!(cache.is_empty());
        assert!(cache.insert("Tucson", Coordinates::new(-110.9747, 32.2226)));
        assert!(!cache.insert("Atlantis", Coordinates::new(0.0, 95.0)));
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup("TUCSON").is_some());
    }
}

use crate::coords::Coordinates;
use serde::{Deserialize, Serialize};

/// A store location as delivered by the location data source.
///
/// Field names follow the camelCase JSON of the source records. Only `id`
/// and the postal fields are required; organizational fields default to
/// empty strings when absent.
///
/// `coordinates` is filled exactly once by the geocoding pipeline. Use
/// [`Location::with_coordinates`], which never overwrites a value that is
/// already present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    #[serde(default)]
    pub group_number: String,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub manager: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub zipcode: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl Location {
    /// Create a location with the identity and postal fields set.
    pub fn new(
        id: impl Into<String>,
        address: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            group_number: String::new(),
            group_name: String::new(),
            name: String::new(),
            manager: String::new(),
            address: address.into(),
            address2: None,
            city: city.into(),
            state: state.into(),
            zipcode: String::new(),
            phone: String::new(),
            fax: None,
            region: String::new(),
            coordinates: None,
        }
    }

    /// Attach coordinates if none are present yet.
    ///
    /// A location that already carries coordinates is returned unchanged.
    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        if self.coordinates.is_none() {
            self.coordinates = Some(coordinates);
        }
        self
    }

    /// Coordinates usable for indexing and reach geometry, if any.
    ///
    /// Out-of-range or non-finite coordinates are treated as absent.
    pub fn valid_coordinates(&self) -> Option<Coordinates> {
        self.coordinates.filter(Coordinates::is_valid)
    }

    pub fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }

    /// Free-text query sent to the geocoding service: `"address, city, state"`.
    pub fn geocode_query(&self) -> String {
        format!("{}, {}, {}", self.address, self.city, self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_coordinates_sets_once() {
        let loc = Location::new("1", "1 Main St", "Phoenix", "AZ")
            .with_coordinates(Coordinates::new(-112.074, 33.4484))
            .with_coordinates(Coordinates::new(0.0, 0.0));
        assert_eq!(loc.coordinates, Some(Coordinates::new(-112.074, 33.4484)));
    }

    #[test]
    fn test_invalid_coordinates_are_not_usable() {
        let mut loc = Location::new("1", "1 Main St", "Phoenix", "AZ");
        loc.coordinates = Some(Coordinates::new(200.0, 33.0));
        assert!(loc.has_coordinates());
        assert!(loc.valid_coordinates().is_none());
    }

    #[test]
    fn test_camel_case_json() {
        let json = r#"{
            "id": "loc-7",
            "groupNumber": "G12",
            "name": "Downtown",
            "address": "100 W Washington St",
            "city": "PHOENIX",
            "state": "AZ",
            "zipcode": "85003",
            "coordinates": [-112.074, 33.4484]
        }"#;
        let loc: Location = serde_json::from_str(json).unwrap();
        assert_eq!(loc.group_number, "G12");
        assert_eq!(loc.region, "");
        assert_eq!(loc.coordinates, Some(Coordinates::new(-112.074, 33.4484)));
        assert_eq!(loc.geocode_query(), "100 W Washington St, PHOENIX, AZ");

        let out = serde_json::to_value(&loc).unwrap();
        assert_eq!(out["groupNumber"], "G12");
        assert!(out.get("fax").is_none());
    }
}

use crate::coords::Coordinates;
use serde::{Deserialize, Serialize};

/// Primary/secondary brand colors of a play (campaign).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayColors {
    pub primary: String,
    pub secondary: String,
}

/// The currently selected play, as far as reach rendering is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaySelection {
    pub play_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<PlayColors>,
    pub audience_size: f64,
}

impl PlaySelection {
    pub fn new(play_id: impl Into<String>, audience_size: f64) -> Self {
        Self {
            play_id: play_id.into(),
            colors: None,
            audience_size,
        }
    }

    pub fn with_colors(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.colors = Some(PlayColors {
            primary: primary.into(),
            secondary: secondary.into(),
        });
        self
    }
}

/// Fill and border colors of a reach overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReachStyle {
    pub fill_color: String,
    pub border_color: String,
}

impl ReachStyle {
    pub fn new(fill_color: impl Into<String>, border_color: impl Into<String>) -> Self {
        Self {
            fill_color: fill_color.into(),
            border_color: border_color.into(),
        }
    }
}

/// A closed ring approximating a campaign's audience footprint around a location.
///
/// `ring[0] == ring[ring.len() - 1]` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReachPolygon {
    pub location_id: String,
    #[serde(default)]
    pub location_name: String,
    pub audience_size: f64,
    pub radius_km: f64,
    pub style: ReachStyle,
    pub ring: Vec<Coordinates>,
}

impl ReachPolygon {
    pub fn with_location_name(mut self, name: impl Into<String>) -> Self {
        self.location_name = name.into();
        self
    }

    /// Number of distinct vertices (the closing vertex is not counted).
    pub fn vertex_count(&self) -> usize {
        self.ring.len().saturating_sub(1)
    }

    pub fn is_closed(&self) -> bool {
        match (self.ring.first(), self.ring.last()) {
            (Some(first), Some(last)) => self.ring.len() > 1 && first == last,
            _ => false,
        }
    }

    /// Convert the ring to a `geo::Polygon` without interior rings.
    pub fn to_polygon(&self) -> geo::Polygon<f64> {
        let exterior: geo::LineString<f64> = self.ring.iter().map(Coordinates::to_coord).collect();
        geo::Polygon::new(exterior, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_json() {
        let json = r##"{
            "playId": "p1",
            "audienceSize": 2500,
            "colors": {"primary": "#111111", "secondary": "#222222"}
        }"##;
        let sel: PlaySelection = serde_json::from_str(json).unwrap();
        assert_eq!(sel.play_id, "p1");
        assert_eq!(sel.audience_size, 2500.0);
        assert_eq!(sel.colors.unwrap().secondary, "#222222");
    }

    #[test]
    fn test_closed_ring() {
        let ring = vec![
            Coordinates::new(0.0, 0.0),
            Coordinates::new(1.0, 0.0),
            Coordinates::new(1.0, 1.0),
            Coordinates::new(0.0, 0.0),
        ];
        let poly = ReachPolygon {
            location_id: "a".into(),
            location_name: String::new(),
            audience_size: 10.0,
            radius_km: 5.0,
            style: ReachStyle::new("#fff", "#000"),
            ring,
        };
        assert!(poly.is_closed());
        assert_eq!(poly.vertex_count(), 3);
        assert_eq!(poly.to_polygon().exterior().0.len(), 4);
    }
}

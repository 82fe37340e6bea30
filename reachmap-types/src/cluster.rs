use crate::coords::Coordinates;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Opaque identifier of an aggregate cluster inside one built index.
///
/// Keys are only meaningful for the index that produced them; a rebuilt
/// index hands out new keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterKey {
    zoom: u8,
    origin: u32,
}

impl ClusterKey {
    #[doc(hidden)]
    pub const fn new(zoom: u8, origin: u32) -> Self {
        Self { zoom, origin }
    }

    /// Zoom level at which this cluster was formed.
    pub const fn zoom(&self) -> u8 {
        self.zoom
    }

    #[doc(hidden)]
    pub const fn origin(&self) -> u32 {
        self.origin
    }
}

impl std::fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.zoom, self.origin)
    }
}

/// One geocoded location as seen by the clustering index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterPoint {
    pub id: String,
    pub coordinates: Coordinates,
    /// Display name of the location, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ClusterPoint {
    pub fn new(id: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            id: id.into(),
            coordinates,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A marker returned by a cluster query: a single point or an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cluster {
    Leaf(ClusterPoint),
    Aggregate {
        key: ClusterKey,
        center: Coordinates,
        point_count: usize,
    },
}

impl Cluster {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Cluster::Leaf(_))
    }

    /// Number of original points represented (1 for a leaf).
    pub fn point_count(&self) -> usize {
        match self {
            Cluster::Leaf(_) => 1,
            Cluster::Aggregate { point_count, .. } => *point_count,
        }
    }

    /// Marker position: the point itself or the cluster centroid.
    pub fn center(&self) -> Coordinates {
        match self {
            Cluster::Leaf(p) => p.coordinates,
            Cluster::Aggregate { center, .. } => *center,
        }
    }

    pub fn key(&self) -> Option<ClusterKey> {
        match self {
            Cluster::Leaf(_) => None,
            Cluster::Aggregate { key, .. } => Some(*key),
        }
    }

    pub fn marker_id(&self) -> MarkerId {
        match self {
            Cluster::Leaf(p) => MarkerId::Location(p.id.clone()),
            Cluster::Aggregate { key, .. } => MarkerId::Cluster(*key),
        }
    }
}

/// Stable identity of a rendered marker, used to diff marker sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerId {
    Location(String),
    Cluster(ClusterKey),
}

/// All markers visible for one viewport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerSet {
    pub zoom: u8,
    pub markers: Vec<Cluster>,
}

impl MarkerSet {
    pub fn new(zoom: u8, markers: Vec<Cluster>) -> Self {
        Self { zoom, markers }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Sum of `point_count` over all markers.
    pub fn total_points(&self) -> usize {
        self.markers.iter().map(Cluster::point_count).sum()
    }

    /// Markers to add and remove to go from `previous` to `self`.
    ///
    /// Markers present in both sets are left alone by the adapter.
    ///
    /// ```
    /// use reachmap_types::cluster::{Cluster, ClusterPoint, MarkerId, MarkerSet};
    /// use reachmap_types::coords::Coordinates;
    ///
    /// let a = Cluster::Leaf(ClusterPoint::new("a", Coordinates::new(0.0, 0.0)));
    /// let b = Cluster::Leaf(ClusterPoint::new("b", Coordinates::new(1.0, 1.0)));
    /// let before = MarkerSet::new(5, vec![a.clone()]);
    /// let after = MarkerSet::new(5, vec![a, b.clone()]);
    ///
    /// let diff = after.diff(&before);
    /// assert_eq!(diff.added, vec![b]);
    /// assert!(diff.removed.is_empty());
    /// ```
    pub fn diff(&self, previous: &MarkerSet) -> MarkerDiff {
        let old_ids: HashSet<MarkerId> = previous.markers.iter().map(Cluster::marker_id).collect();
        let new_ids: HashSet<MarkerId> = self.markers.iter().map(Cluster::marker_id).collect();

        let added = self
            .markers
            .iter()
            .filter(|m| !old_ids.contains(&m.marker_id()))
            .cloned()
            .collect();
        let removed = previous
            .markers
            .iter()
            .map(Cluster::marker_id)
            .filter(|id| !new_ids.contains(id))
            .collect();

        MarkerDiff { added, removed }
    }
}

/// Incremental update for a rendering adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerDiff {
    pub added: Vec<Cluster>,
    pub removed: Vec<MarkerId>,
}

impl MarkerDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

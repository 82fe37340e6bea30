//! Hierarchical point clustering for map viewports.
//!
//! The index is built once per point set. Points are projected onto the unit
//! Web Mercator square and stored at level `max_zoom + 1`; every lower level
//! `z` is derived from level `z + 1` by greedily merging each unclaimed node
//! with its unclaimed neighbours within `radius / (extent * 2^z)` projected
//! units. Each level keeps two R*-trees: one over node positions for
//! merging, and one over the projected extent of every node's members for
//! viewport queries. A cluster whose members straddle the viewport edge is
//! replaced by its children, so every marker lies wholly inside the viewport.
//!
//! # Example
//!
//! ```rust
//! use reachmap::compute::cluster::SpatialIndex;
//! use reachmap::{BoundingBox, ClusterOptions, ClusterPoint, Coordinates};
//!
//! let points = vec![
//!     ClusterPoint::new("a", Coordinates::new(-112.07, 33.44)),
//!     ClusterPoint::new("b", Coordinates::new(-112.08, 33.45)),
//!     ClusterPoint::new("c", Coordinates::new(-87.63, 41.88)),
//! ];
//! let index = SpatialIndex::build(points, ClusterOptions::default())?;
//!
//! let markers = index.clusters(&BoundingBox::world(), 4)?;
//! assert_eq!(markers.len(), 2);
//!
//! let key = markers.iter().find_map(|m| m.key()).unwrap();
//! assert!(index.expansion_zoom(key).unwrap() > 4);
//! # Ok::<(), reachmap::ReachMapError>(())
//! ```

use crate::compute::projection::{lat_to_y, lng_to_x, wrap_lng, x_to_lng, y_to_lat};
use crate::compute::validation::{validate_bbox, validate_location};
use crate::config::ClusterOptions;
use crate::error::{ReachMapError, Result};
use reachmap_types::bbox::BoundingBox;
use reachmap_types::cluster::{Cluster, ClusterKey, ClusterPoint};
use reachmap_types::coords::Coordinates;
use reachmap_types::location::Location;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, Envelope, RTree};
use smallvec::SmallVec;

type IndexedNode = GeomWithData<[f64; 2], usize>;
type IndexedExtent = GeomWithData<Rectangle<[f64; 2]>, usize>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum NodeKind {
    /// Index into `SpatialIndex::points`.
    Point(usize),
    Cluster(ClusterKey),
}

#[derive(Debug, Clone)]
struct Node {
    x: f64,
    y: f64,
    num_points: usize,
    /// Projected bounds of every point under this node.
    extent: AABB<[f64; 2]>,
    kind: NodeKind,
    /// Cluster this node was merged into one zoom level lower.
    parent: Option<ClusterKey>,
}

impl Node {
    fn carried(&self) -> Self {
        Self {
            parent: None,
            ..self.clone()
        }
    }
}

struct Level {
    nodes: Vec<Node>,
    tree: RTree<IndexedNode>,
    extents: RTree<IndexedExtent>,
}

impl Level {
    fn new(nodes: Vec<Node>) -> Self {
        let entries = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| GeomWithData::new([n.x, n.y], i))
            .collect();
        let extents = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| GeomWithData::new(Rectangle::from_aabb(n.extent), i))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            extents: RTree::bulk_load(extents),
            nodes,
        }
    }

    /// Node indices within `r` of `(x, y)`, ascending.
    fn within(&self, x: f64, y: f64, r: f64) -> SmallVec<[usize; 16]> {
        let mut ids: SmallVec<[usize; 16]> = self
            .tree
            .locate_within_distance([x, y], r * r)
            .map(|e| e.data)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Indices of nodes with at least one member inside `envelope`, ascending.
    fn overlapping(&self, envelope: &AABB<[f64; 2]>) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .extents
            .locate_in_envelope_intersecting(envelope)
            .map(|e| e.data)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Immutable multi-resolution cluster index over one point set.
///
/// Rebuild it whenever the point set changes; queries never mutate it, so a
/// built index can be shared behind an `Arc` and swapped wholesale.
pub struct SpatialIndex {
    options: ClusterOptions,
    points: Vec<ClusterPoint>,
    /// `levels[z - min_zoom]` for `z` in `min_zoom..=max_zoom + 1`.
    levels: Vec<Level>,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("options", &self.options)
            .field("points", &self.points.len())
            .field("levels", &self.levels.len())
            .finish()
    }
}

impl SpatialIndex {
    /// Build the index. Points with out-of-range or non-finite coordinates
    /// are dropped with a warning.
    pub fn build(points: Vec<ClusterPoint>, options: ClusterOptions) -> Result<Self> {
        options.validate().map_err(ReachMapError::InvalidConfig)?;

        let total = points.len();
        let points: Vec<ClusterPoint> = points
            .into_iter()
            .filter(|p| {
                let valid = p.coordinates.is_valid();
                if !valid {
                    log::warn!(
                        "Excluding point {} with invalid coordinates {:?} from cluster index",
                        p.id,
                        p.coordinates
                    );
                }
                valid
            })
            .collect();
        if points.len() < total {
            log::debug!(
                "Cluster index dropped {} of {} points",
                total - points.len(),
                total
            );
        }

        let leaves: Vec<Node> = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let x = lng_to_x(p.coordinates.lng());
                let y = lat_to_y(p.coordinates.lat());
                Node {
                    x,
                    y,
                    num_points: 1,
                    extent: AABB::from_point([x, y]),
                    kind: NodeKind::Point(i),
                    parent: None,
                }
            })
            .collect();

        let mut levels = Vec::with_capacity((options.max_zoom - options.min_zoom) as usize + 2);
        let mut current = Level::new(leaves);
        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let next = Self::cluster_level(&mut current, zoom, &options);
            levels.push(current);
            current = Level::new(next);
        }
        levels.push(current);
        levels.reverse();

        log::debug!(
            "Built cluster index over {} points, zoom {}..={}",
            points.len(),
            options.min_zoom,
            options.max_zoom
        );

        Ok(Self {
            options,
            points,
            levels,
        })
    }

    /// Build from locations, using only those with valid coordinates.
    pub fn from_locations(locations: &[Location], options: ClusterOptions) -> Result<Self> {
        let points = locations
            .iter()
            .filter(|loc| match validate_location(loc) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Excluding from cluster index: {}", e);
                    false
                }
            })
            .filter_map(|loc| {
                let point = ClusterPoint::new(loc.id.clone(), loc.coordinates?);
                Some(if loc.name.is_empty() {
                    point
                } else {
                    point.with_name(loc.name.clone())
                })
            })
            .collect();
        Self::build(points, options)
    }

    /// Derive the nodes of level `zoom` from `prev` (level `zoom + 1`),
    /// recording parents on `prev`.
    fn cluster_level(prev: &mut Level, zoom: u8, options: &ClusterOptions) -> Vec<Node> {
        let r = options.radius / (options.extent * 2f64.powi(zoom as i32));
        let mut claimed = vec![false; prev.nodes.len()];
        let mut next = Vec::with_capacity(prev.nodes.len());

        for i in 0..prev.nodes.len() {
            if claimed[i] {
                continue;
            }
            claimed[i] = true;

            let (px, py, origin_points, origin_extent) = {
                let p = &prev.nodes[i];
                (p.x, p.y, p.num_points, p.extent)
            };
            let neighbors = prev.within(px, py, r);

            let num_points = origin_points
                + neighbors
                    .iter()
                    .filter(|&&j| !claimed[j])
                    .map(|&j| prev.nodes[j].num_points)
                    .sum::<usize>();

            if num_points > origin_points && num_points >= options.min_points {
                let key = ClusterKey::new(zoom, i as u32);
                let mut wx = px * origin_points as f64;
                let mut wy = py * origin_points as f64;
                let mut extent = origin_extent;

                for &j in &neighbors {
                    if claimed[j] {
                        continue;
                    }
                    claimed[j] = true;
                    let b = &mut prev.nodes[j];
                    wx += b.x * b.num_points as f64;
                    wy += b.y * b.num_points as f64;
                    extent.merge(&b.extent);
                    b.parent = Some(key);
                }
                prev.nodes[i].parent = Some(key);

                next.push(Node {
                    x: wx / num_points as f64,
                    y: wy / num_points as f64,
                    num_points,
                    extent,
                    kind: NodeKind::Cluster(key),
                    parent: None,
                });
            } else {
                next.push(prev.nodes[i].carried());
                if num_points > 1 {
                    for &j in &neighbors {
                        if claimed[j] {
                            continue;
                        }
                        claimed[j] = true;
                        next.push(prev.nodes[j].carried());
                    }
                }
            }
        }

        next
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ClusterPoint] {
        &self.points
    }

    fn level(&self, zoom: u8) -> &Level {
        let z = zoom.clamp(self.options.min_zoom, self.options.max_zoom + 1);
        &self.levels[(z - self.options.min_zoom) as usize]
    }

    fn to_cluster(&self, node: &Node) -> Cluster {
        match node.kind {
            NodeKind::Point(i) => Cluster::Leaf(self.points[i].clone()),
            NodeKind::Cluster(key) => Cluster::Aggregate {
                key,
                center: Coordinates::new(x_to_lng(node.x), y_to_lat(node.y)),
                point_count: node.num_points,
            },
        }
    }

    /// Markers covering exactly the indexed points inside `bbox` at `zoom`.
    ///
    /// Every point inside the box appears in exactly one marker and no marker
    /// counts a point outside it: a cluster whose members straddle the box
    /// edge is split into its children, recursively down to single points.
    ///
    /// Zooms outside the index range are clamped. Longitudes are wrapped, so
    /// a box crossing the antimeridian (`west > east`) is answered as the
    /// union of its two halves.
    pub fn clusters(&self, bbox: &BoundingBox, zoom: u8) -> Result<Vec<Cluster>> {
        validate_bbox(bbox)?;

        let mut min_lng = wrap_lng(bbox.west);
        let min_lat = bbox.south.clamp(-90.0, 90.0);
        let mut max_lng = if bbox.east == 180.0 {
            180.0
        } else {
            wrap_lng(bbox.east)
        };
        let max_lat = bbox.north.clamp(-90.0, 90.0);

        if bbox.east - bbox.west >= 360.0 {
            min_lng = -180.0;
            max_lng = 180.0;
        } else if min_lng > max_lng {
            let mut eastern =
                self.clusters(&BoundingBox::new(min_lng, min_lat, 180.0, max_lat), zoom)?;
            let western =
                self.clusters(&BoundingBox::new(-180.0, min_lat, max_lng, max_lat), zoom)?;
            eastern.extend(western);
            return Ok(eastern);
        }

        let query = AABB::from_corners(
            [lng_to_x(min_lng), lat_to_y(max_lat)],
            [lng_to_x(max_lng), lat_to_y(min_lat)],
        );
        let level = self.level(zoom);
        let mut markers = Vec::new();
        for i in level.overlapping(&query) {
            self.collect_inside(&level.nodes[i], &query, &mut markers);
        }
        Ok(markers)
    }

    /// Push `node` if all its members lie in `query`, otherwise its children.
    fn collect_inside(&self, node: &Node, query: &AABB<[f64; 2]>, out: &mut Vec<Cluster>) {
        if query.contains_envelope(&node.extent) {
            out.push(self.to_cluster(node));
            return;
        }
        if !query.intersects(&node.extent) {
            return;
        }
        let NodeKind::Cluster(key) = node.kind else {
            return;
        };
        if let Some((level, ids)) = self.child_ids(key) {
            for i in ids {
                self.collect_inside(&level.nodes[i], query, out);
            }
        }
    }

    /// Resolve a key to its origin node, rejecting keys this index did not issue.
    fn origin(&self, key: ClusterKey) -> Option<(&Level, &Node)> {
        if key.zoom() < self.options.min_zoom || key.zoom() > self.options.max_zoom {
            return None;
        }
        let level = self.level(key.zoom() + 1);
        let node = level.nodes.get(key.origin() as usize)?;
        (node.parent == Some(key)).then_some((level, node))
    }

    /// The aggregate marker for `key` at its own zoom.
    pub fn cluster(&self, key: ClusterKey) -> Option<Cluster> {
        let (_, origin) = self.origin(key)?;
        // The merged center is a weighted mean of nodes within `r` of the origin.
        let r = self.options.radius / (self.options.extent * 2f64.powi(key.zoom() as i32));
        let level = self.level(key.zoom());
        level
            .within(origin.x, origin.y, r)
            .into_iter()
            .map(|i| &level.nodes[i])
            .find(|n| n.kind == NodeKind::Cluster(key))
            .map(|n| self.to_cluster(n))
    }

    /// Level one zoom deeper than `key` and the indices of its children there.
    fn child_ids(&self, key: ClusterKey) -> Option<(&Level, SmallVec<[usize; 16]>)> {
        let (level, origin) = self.origin(key)?;
        // Merged members were all found within `r` of the origin.
        let r = self.options.radius / (self.options.extent * 2f64.powi(key.zoom() as i32));
        let mut ids = level.within(origin.x, origin.y, r);
        ids.retain(|i| level.nodes[*i].parent == Some(key));
        Some((level, ids))
    }

    /// The clusters and points a cluster splits into one zoom level deeper.
    pub fn children(&self, key: ClusterKey) -> Option<Vec<Cluster>> {
        let (level, ids) = self.child_ids(key)?;
        Some(
            ids.into_iter()
                .map(|i| self.to_cluster(&level.nodes[i]))
                .collect(),
        )
    }

    /// Lowest zoom at which the cluster's children are no longer merged.
    ///
    /// Returns `None` for a key that does not belong to this index.
    pub fn expansion_zoom(&self, key: ClusterKey) -> Option<u8> {
        self.origin(key)?;
        let mut key = key;
        let mut expansion = key.zoom();
        while expansion <= self.options.max_zoom {
            let children = self.children(key)?;
            expansion += 1;
            if children.len() != 1 {
                break;
            }
            match children[0].key() {
                Some(child) => key = child,
                None => break,
            }
        }
        Some(expansion)
    }

    /// Original points inside a cluster, skipping `offset` and returning at most `limit`.
    pub fn leaves(
        &self,
        key: ClusterKey,
        limit: usize,
        offset: usize,
    ) -> Option<Vec<ClusterPoint>> {
        self.origin(key)?;
        let mut out = Vec::with_capacity(limit.min(64));
        let mut skipped = 0;
        self.append_leaves(key, limit, offset, &mut skipped, &mut out);
        Some(out)
    }

    fn append_leaves(
        &self,
        key: ClusterKey,
        limit: usize,
        offset: usize,
        skipped: &mut usize,
        out: &mut Vec<ClusterPoint>,
    ) {
        let Some(children) = self.children(key) else {
            return;
        };
        for child in children {
            if out.len() >= limit {
                return;
            }
            match child {
                Cluster::Leaf(point) => {
                    if *skipped < offset {
                        *skipped += 1;
                    } else {
                        out.push(point);
                    }
                }
                Cluster::Aggregate {
                    key: child_key,
                    point_count,
                    ..
                } => {
                    if *skipped + point_count <= offset {
                        *skipped += point_count;
                    } else {
                        self.append_leaves(child_key, limit, offset, skipped, out);
                    }
                }
            }
        }
    }
}

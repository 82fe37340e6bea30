use crate::coords::Coordinates;
use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees.
///
/// Stored as `(west, south, east, north)`, the order map widgets report
/// their visible bounds in. A box whose `west` is greater than its `east`
/// crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Create a new bounding box from its edges.
    ///
    /// # Examples
    ///
    /// ```
    /// use reachmap_types::bbox::BoundingBox;
    ///
    /// let conus = BoundingBox::new(-125.0, 24.0, -66.0, 50.0);
    /// assert_eq!(conus.width(), 59.0);
    /// ```
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The whole world.
    pub const fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    /// Smallest box containing all the given coordinates, or `None` when empty.
    pub fn from_coordinates<'a, I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinates>,
    {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let start = Self::new(first.lng(), first.lat(), first.lng(), first.lat());
        Some(iter.fold(start, |bbox, c| bbox.extend(c)))
    }

    /// Grow the box to include `c`. Not antimeridian aware.
    pub fn extend(&self, c: &Coordinates) -> Self {
        Self::new(
            self.west.min(c.lng()),
            self.south.min(c.lat()),
            self.east.max(c.lng()),
            self.north.max(c.lat()),
        )
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Longitudinal span in degrees, accounting for antimeridian crossing.
    pub fn width(&self) -> f64 {
        if self.crosses_antimeridian() {
            self.east + 360.0 - self.west
        } else {
            self.east - self.west
        }
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    pub fn center(&self) -> Coordinates {
        let mut lng = self.west + self.width() / 2.0;
        if lng > 180.0 {
            lng -= 360.0;
        }
        Coordinates::new(lng, (self.south + self.north) / 2.0)
    }

    /// Check if a coordinate lies within this box (edges inclusive).
    pub fn contains(&self, c: &Coordinates) -> bool {
        let in_lat = c.lat() >= self.south && c.lat() <= self.north;
        let in_lng = if self.crosses_antimeridian() {
            c.lng() >= self.west || c.lng() <= self.east
        } else {
            c.lng() >= self.west && c.lng() <= self.east
        };
        in_lat && in_lng
    }

    /// Convert to a `geo::Rect`. Returns `None` for antimeridian-crossing boxes,
    /// which have no single-rectangle representation.
    pub fn to_rect(&self) -> Option<geo::Rect<f64>> {
        if self.crosses_antimeridian() {
            return None;
        }
        Some(geo::Rect::new(
            geo::coord! { x: self.west, y: self.south },
            geo::coord! { x: self.east, y: self.north },
        ))
    }

    /// `[west, south, east, north]`, the GeoJSON bbox order.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        Self::new(west, south, east, north)
    }
}

/// The visible map area and its integer zoom level.
///
/// Owned by the rendering surface; the engine only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bbox: BoundingBox,
    pub zoom: u8,
}

impl Viewport {
    pub const fn new(bbox: BoundingBox, zoom: u8) -> Self {
        Self { bbox, zoom }
    }

    /// Build a viewport from a widget's fractional zoom, flooring it.
    ///
    /// Negative or non-finite zooms become 0; zooms above 255 saturate.
    pub fn from_fractional_zoom(bbox: BoundingBox, zoom: f64) -> Self {
        let zoom = if zoom.is_finite() {
            zoom.floor().clamp(0.0, u8::MAX as f64) as u8
        } else {
            0
        };
        Self { bbox, zoom }
    }
}

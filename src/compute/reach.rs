//! Audience-reach circles.
//!
//! Circles are built with an equirectangular approximation: one degree of
//! latitude is `km_per_degree` kilometres and one degree of longitude is
//! that scaled by `cos(latitude)`. This holds for moderate radii away from
//! the poles; near the poles `cos(latitude)` tends to zero and the ring
//! stretches without bound. That range is outside the intended use and is
//! not guarded.

use crate::compute::validation::{validate_coordinates, validate_radius_km};
use crate::config::ReachOptions;
use crate::error::{ReachMapError, Result};
use reachmap_types::coords::Coordinates;
use reachmap_types::location::Location;
use reachmap_types::reach::{PlaySelection, ReachPolygon, ReachStyle};

/// Builds reach polygons from a center and an audience size.
#[derive(Debug, Clone)]
pub struct ReachGeometryBuilder {
    options: ReachOptions,
}

impl ReachGeometryBuilder {
    pub fn new(options: ReachOptions) -> Result<Self> {
        options.validate().map_err(ReachMapError::InvalidConfig)?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ReachOptions {
        &self.options
    }

    /// Map an audience size to a radius in kilometres.
    ///
    /// `audience_size / audience_divisor`, clamped to
    /// `[min_radius_km, max_radius_km]`. Monotonic in `audience_size`;
    /// negative or non-finite sizes give the minimum.
    ///
    /// ```
    /// use reachmap::compute::reach::ReachGeometryBuilder;
    /// use reachmap::ReachOptions;
    ///
    /// let builder = ReachGeometryBuilder::new(ReachOptions::default()).unwrap();
    /// assert_eq!(builder.radius_for_audience(100.0), 5.0);
    /// assert_eq!(builder.radius_for_audience(2_000.0), 20.0);
    /// assert_eq!(builder.radius_for_audience(1_000_000.0), 50.0);
    /// ```
    pub fn radius_for_audience(&self, audience_size: f64) -> f64 {
        let o = &self.options;
        if !audience_size.is_finite() {
            return if audience_size == f64::INFINITY {
                o.max_radius_km
            } else {
                o.min_radius_km
            };
        }
        (audience_size / o.audience_divisor).clamp(o.min_radius_km, o.max_radius_km)
    }

    /// Closed ring around `center` with `vertex_count + 1` entries.
    pub fn build_ring(&self, center: Coordinates, radius_km: f64) -> Result<Vec<Coordinates>> {
        validate_coordinates(&center)?;
        validate_radius_km(radius_km)?;

        let n = self.options.vertex_count;
        let lat_offset = radius_km / self.options.km_per_degree;
        let lon_offset =
            radius_km / (self.options.km_per_degree * center.lat().to_radians().cos());

        let mut ring = Vec::with_capacity(n + 1);
        for i in 0..n {
            let angle = (i as f64 * 360.0 / n as f64).to_radians();
            ring.push(Coordinates::new(
                center.lng() + lon_offset * angle.cos(),
                center.lat() + lat_offset * angle.sin(),
            ));
        }
        // Repeat the first vertex exactly; sin(2*pi) is not exactly zero.
        ring.push(ring[0]);
        Ok(ring)
    }

    /// Build a reach polygon for one location.
    pub fn build_circle(
        &self,
        location_id: impl Into<String>,
        center: Coordinates,
        radius_km: f64,
        audience_size: f64,
        style: ReachStyle,
    ) -> Result<ReachPolygon> {
        let ring = self.build_ring(center, radius_km)?;
        Ok(ReachPolygon {
            location_id: location_id.into(),
            location_name: String::new(),
            audience_size,
            radius_km,
            style,
            ring,
        })
    }

    /// Style for a play, falling back to the configured default colors.
    pub fn style_for(&self, selection: &PlaySelection) -> ReachStyle {
        match &selection.colors {
            Some(colors) => ReachStyle::new(colors.secondary.clone(), colors.primary.clone()),
            None => ReachStyle::new(
                self.options.default_fill_color.clone(),
                self.options.default_border_color.clone(),
            ),
        }
    }

    /// One polygon per location with valid coordinates, in input order.
    ///
    /// Locations without usable coordinates are skipped.
    pub fn build_for_play(
        &self,
        locations: &[Location],
        selection: &PlaySelection,
    ) -> Vec<ReachPolygon> {
        let radius_km = self.radius_for_audience(selection.audience_size);
        let style = self.style_for(selection);

        locations
            .iter()
            .filter_map(|loc| {
                let center = loc.valid_coordinates()?;
                match self.build_circle(
                    loc.id.clone(),
                    center,
                    radius_km,
                    selection.audience_size,
                    style.clone(),
                ) {
                    Ok(polygon) => Some(polygon.with_location_name(loc.name.clone())),
                    Err(e) => {
                        log::warn!("Skipping reach polygon for {}: {}", loc.id, e);
                        None
                    }
                }
            })
            .collect()
    }
}

impl Default for ReachGeometryBuilder {
    fn default() -> Self {
        Self {
            options: ReachOptions::default(),
        }
    }
}

//! Spherical Web Mercator projection onto the unit square.
//!
//! `x` grows eastward from 0 at -180 to 1 at 180, `y` grows southward from 0
//! near the north pole to 1 near the south pole. Clustering distances are
//! measured in these units, so one tile of `extent` pixels at zoom `z`
//! spans `1 / 2^z` of the square.

use std::f64::consts::PI;

#[inline]
pub fn lng_to_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

#[inline]
pub fn lat_to_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

#[inline]
pub fn x_to_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

#[inline]
pub fn y_to_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Wrap any longitude into [-180, 180).
#[inline]
pub fn wrap_lng(lng: f64) -> f64 {
    if (-180.0..180.0).contains(&lng) {
        return lng;
    }
    ((lng + 180.0) % 360.0 + 360.0) % 360.0 - 180.0
}

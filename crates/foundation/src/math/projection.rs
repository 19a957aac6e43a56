//! Geodesic <-> world grid transform.
//!
//! World units are pixels of a Web-Mercator tile pyramid at a fixed
//! maximum zoom level [`WORLD_LEVEL`] with base tile size [`TILE_SIZE`].
//! Both axes span `[0, TILE_SIZE * 2^WORLD_LEVEL]`; `x` grows eastward
//! and `y` grows southward.
//!
//! All functions are pure and safe to call from any thread.

use core::f64::consts::PI;

use super::geodesy::{LatLng, WGS84_A};

/// Base tile size in pixels (`R`).
pub const TILE_SIZE: f64 = 256.0;
/// Fixed pyramid level the world grid is expressed at (`W`).
pub const WORLD_LEVEL: i32 = 22;
/// Latitude where the Mercator band ends (`atanh(sin(lat)) == PI`).
pub const MERCATOR_MAX_LAT_DEG: f64 = 85.051_128_779_806_59;

/// Width (and height) of the world grid in world units.
pub fn world_extent() -> f64 {
    TILE_SIZE * 2f64.powi(WORLD_LEVEL)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WorldCoord {
    pub x: f64,
    pub y: f64,
}

impl WorldCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ProjectionError {
    NonFinite { a: f64, b: f64 },
    LatitudeOutOfRange { lat_deg: f64 },
}

impl std::fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionError::NonFinite { a, b } => {
                write!(f, "coordinate is not finite: ({a}, {b})")
            }
            ProjectionError::LatitudeOutOfRange { lat_deg } => {
                write!(f, "latitude {lat_deg} is outside [-90, 90]")
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

/// Geodesic degrees to world units.
///
/// Exactly +/-90 degrees would hit the `atanh` singularity; they map to the
/// two edges of the world grid (`y = 0` north, `y = extent` south).
/// Latitudes beyond the poles are rejected; longitude is not wrapped.
pub fn to_world(lat_deg: f64, lng_deg: f64) -> Result<WorldCoord, ProjectionError> {
    if !lat_deg.is_finite() || !lng_deg.is_finite() {
        return Err(ProjectionError::NonFinite {
            a: lat_deg,
            b: lng_deg,
        });
    }
    if lat_deg.abs() > 90.0 {
        return Err(ProjectionError::LatitudeOutOfRange { lat_deg });
    }

    let extent = world_extent();
    let y = if lat_deg >= 90.0 {
        0.0
    } else if lat_deg <= -90.0 {
        extent
    } else {
        (PI - lat_deg.to_radians().sin().atanh()) / PI * TILE_SIZE / 2.0 * 2f64.powi(WORLD_LEVEL)
    };
    let x = (lng_deg + 180.0) / 360.0 * extent;

    Ok(WorldCoord::new(x, y))
}

/// World units back to geodesic degrees.
pub fn to_geo(x: f64, y: f64) -> Result<LatLng, ProjectionError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(ProjectionError::NonFinite { a: x, b: y });
    }

    let extent = world_extent();
    let lat = (PI - 2.0 * PI * y / extent).sinh().atan().to_degrees();
    let lng = x / extent * 360.0 - 180.0;

    Ok(LatLng::new(lat, lng))
}

/// Ground sampling distance in meters per pixel at `lat_deg` and `zoom`.
pub fn ground_resolution(lat_deg: f64, zoom: f64) -> Result<f64, ProjectionError> {
    if !lat_deg.is_finite() || !zoom.is_finite() {
        return Err(ProjectionError::NonFinite {
            a: lat_deg,
            b: zoom,
        });
    }
    Ok(lat_deg.to_radians().cos() * WGS84_A * 2.0 * PI / 2f64.powf(zoom))
}

//! Project lat/lon coordinates onto the Web Mercator tile grid.
//! <https://en.wikipedia.org/wiki/Web_Mercator_projection>
//! <https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames>

use std::f64::consts::PI;

use crate::position::Position;

// zoom level   tile coverage  number of tiles  tile size(*) in degrees
// 0            1 tile         1 tile           360° x 170.1022°
// 1            2 × 2 tiles    4 tiles          180° x 85.0511°
// 2            4 × 4 tiles    16 tiles         90° x [variable]

/// Number of tiles per axis at the given zoom level.
pub fn total_tiles(zoom: u8) -> u32 {
    2u32.pow(zoom as u32)
}

/// Meters per pixel at the equator for zoom 0 with 256px tiles, i.e. earth
/// circumference / 256.
const EQUATOR_METERS_PER_PIXEL: f64 = 156_543.033_92;

/// Transform longitude to a fractional tile number.
pub fn lon_to_x(lon: f64, zoom: u8) -> f64 {
    ((lon + 180.) / 360.) * total_tiles(zoom) as f64
}

/// Transform latitude to a fractional tile number. Undefined at the poles, where the Mercator
/// projection diverges.
pub fn lat_to_y(lat: f64, zoom: u8) -> f64 {
    let lat = lat.to_radians();
    (1. - ((lat.tan() + 1. / lat.cos()).ln() / PI)) / 2. * total_tiles(zoom) as f64
}

/// Transform a fractional tile number back to longitude.
pub fn x_to_lon(x: f64, zoom: u8) -> f64 {
    x / total_tiles(zoom) as f64 * 360. - 180.
}

/// Transform a fractional tile number back to latitude.
pub fn y_to_lat(y: f64, zoom: u8) -> f64 {
    (PI * (1. - 2. * y / total_tiles(zoom) as f64))
        .sinh()
        .atan()
        .to_degrees()
}

/// Ground distance covered by a single pixel at the given zoom and latitude, used to express
/// circle radii in pixels.
pub fn meters_to_pixels(meters: f64, zoom: u8, lat: f64) -> f64 {
    let meters_per_pixel =
        EQUATOR_METERS_PER_PIXEL * lat.to_radians().cos() / total_tiles(zoom) as f64;
    meters / meters_per_pixel
}

/// Project the position into fractional tile coordinates.
pub(crate) fn project(position: Position, zoom: u8) -> (f64, f64) {
    (lon_to_x(position.x(), zoom), lat_to_y(position.y(), zoom))
}

/// Identifies the tile in the tile grid.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TileId {
    /// X number of the tile.
    pub x: u32,

    /// Y number of the tile.
    pub y: u32,

    /// Zoom level, where 0 means no zoom.
    /// See: <https://wiki.openstreetmap.org/wiki/Zoom_levels>
    pub zoom: u8,
}

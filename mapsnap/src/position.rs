//! Types and functions for working with geographical positions.

/// Geographical position with latitude and longitude.
pub type Position = geo_types::Point;

/// Construct `Position` from latitude and longitude.
pub fn lat_lon(lat: f64, lon: f64) -> Position {
    Position::new(lon, lat)
}

/// Construct `Position` from longitude and latitude. Note that it is common standard to write
/// coordinates starting with the latitude instead (e.g. `52.4945528, 13.437524` is a crossing
/// in Berlin-Neukölln).
pub fn lon_lat(lon: f64, lat: f64) -> Position {
    Position::new(lon, lat)
}

use super::DEFAULT_COLOR;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::position::Position;

/// Mean earth radius in meters, as used for the geodesic extent of a circle.
const EARTH_RADIUS: f64 = 6_371_000.;

/// A circle with a ground-distance radius, centered on a geographical coordinate.
#[derive(Debug, Clone)]
pub struct Circle {
    pub coord: Position,
    /// Radius in meters.
    pub radius: f64,
    pub color: String,
    pub fill: String,
    pub width: f64,
}

impl Circle {
    /// Fails for a radius that is zero, negative or not a number.
    pub fn new(coord: Position, radius: f64) -> Result<Self> {
        if radius.is_nan() || radius <= 0. {
            return Err(Error::InvalidCircle);
        }
        Ok(Self {
            coord,
            radius,
            color: DEFAULT_COLOR.to_owned(),
            fill: "#AA0000BB".to_owned(),
            width: 3.,
        })
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = fill.into();
        self
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    /// Bounding box of the geodesic circle on a spherical earth.
    pub(crate) fn extent(&self) -> Extent {
        let (lon, lat) = (self.coord.x(), self.coord.y());
        let delta_lat = (self.radius / EARTH_RADIUS).to_degrees();
        let delta_lon = delta_lat / lat.to_radians().cos();
        Extent::new(
            lon - delta_lon,
            lat - delta_lat,
            lon + delta_lon,
            lat + delta_lat,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::lon_lat;

    #[test]
    fn rejects_degenerate_radius() {
        assert!(Circle::new(lon_lat(0., 0.), 0.).is_err());
        assert!(Circle::new(lon_lat(0., 0.), -10.).is_err());
        assert!(Circle::new(lon_lat(0., 0.), f64::NAN).is_err());
        assert!(Circle::new(lon_lat(0., 0.), 100.).is_ok());
    }

    #[test]
    fn extent_is_centered_and_widens_with_latitude() {
        let equator = Circle::new(lon_lat(10., 0.), 1000.).unwrap().extent();
        approx::assert_relative_eq!(
            equator.max_lon - 10.,
            10. - equator.min_lon,
            max_relative = 1e-9
        );

        let north = Circle::new(lon_lat(10., 60.), 1000.).unwrap().extent();
        let equator_span = equator.max_lon - equator.min_lon;
        let north_span = north.max_lon - north.min_lon;
        // Same latitude span, roughly double the longitude span at 60°N.
        approx::assert_relative_eq!(
            north.max_lat - north.min_lat,
            equator.max_lat - equator.min_lat,
            max_relative = 1e-9
        );
        approx::assert_relative_eq!(north_span / equator_span, 2., max_relative = 1e-2);
    }
}

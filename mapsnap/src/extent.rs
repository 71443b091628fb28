//! Combined bounding boxes of map features, and the zoom search that fits them onto the canvas.

use crate::features::{FeatureRef, FeatureSet, Marker};
use crate::mercator::{lat_to_y, lon_to_x, x_to_lon, y_to_lat};
use crate::position::Position;

/// Axis-aligned geographical bounding box.
///
/// `min <= max` holds per axis as long as the box does not cross the ±180° meridian. Boxes that
/// do cross it are not handled specially anywhere in this crate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Extent {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Smallest box containing all given positions, or `None` for an empty sequence.
    pub(crate) fn from_positions<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = Position>,
    {
        let mut positions = positions.into_iter();
        let first = positions.next()?;
        let mut extent = Self::new(first.x(), first.y(), first.x(), first.y());
        for position in positions {
            extent.min_lon = extent.min_lon.min(position.x());
            extent.min_lat = extent.min_lat.min(position.y());
            extent.max_lon = extent.max_lon.max(position.x());
            extent.max_lat = extent.max_lat.max(position.y());
        }
        Some(extent)
    }

    fn union(self, other: Self) -> Self {
        Self {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    pub(crate) fn center(&self) -> Position {
        Position::new(
            (self.min_lon + self.max_lon) / 2.,
            (self.min_lat + self.max_lat) / 2.,
        )
    }
}

/// Inclusive zoom levels considered when fitting features onto the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    pub min: u8,
    pub max: u8,
}

impl Default for ZoomRange {
    fn default() -> Self {
        // Mapnik-style servers commonly stop at 17/18, and the OSM fair-use policy discourages
        // bulk requests at higher levels anyway.
        Self { min: 1, max: 17 }
    }
}

/// Union of the extents of all features, plus the optional explicit viewport box.
///
/// Markers are a special case: with a known zoom (and a known icon size), the icon's pixel
/// footprint around the anchor is converted back to a geographical delta so that the fitted
/// viewport keeps the whole icon visible. Without a zoom only the anchor coordinate counts.
///
/// All per-feature boxes are collected into one flat list before taking min/max per axis.
pub(crate) fn determine_extent(
    features: &FeatureSet,
    viewport: Option<Extent>,
    zoom: Option<u8>,
    tile_size: u32,
) -> Option<Extent> {
    let mut extents: Vec<Extent> = Vec::new();

    if let Some(viewport) = viewport {
        extents.push(viewport);
    }

    for feature in features.iter() {
        let extent = match feature {
            FeatureRef::Line(line) => line.extent(),
            FeatureRef::MultiPolygon(multipolygon) => multipolygon.extent(),
            FeatureRef::Circle(circle) => Some(circle.extent()),
            FeatureRef::Bound(bound) => bound.extent(),
            FeatureRef::Marker(marker) => Some(marker_extent(marker, zoom, tile_size)),
            // Text is an annotation; it never grows the fitted viewport.
            FeatureRef::Text(_) => None,
        };
        extents.extend(extent);
    }

    extents.into_iter().reduce(Extent::union)
}

fn marker_extent(marker: &Marker, zoom: Option<u8>, tile_size: u32) -> Extent {
    let (lon, lat) = (marker.coord.x(), marker.coord.y());

    if let (Some(zoom), Some([left, bottom, right, top])) = (zoom, marker.extent_px()) {
        let tile_size = tile_size as f64;
        let x = lon_to_x(lon, zoom);
        let y = lat_to_y(lat, zoom);
        Extent::new(
            x_to_lon(x - left / tile_size, zoom),
            y_to_lat(y + bottom / tile_size, zoom),
            x_to_lon(x + right / tile_size, zoom),
            y_to_lat(y - top / tile_size, zoom),
        )
    } else {
        Extent::new(lon, lat, lon, lat)
    }
}

/// Find the highest zoom level at which all features fit onto the padded canvas.
///
/// A greedy descending scan; the required pixel size shrinks monotonically with the zoom level
/// and there are at most ~20 levels, so nothing smarter is warranted. Falls back to the range
/// minimum when nothing fits.
pub(crate) fn calculate_zoom(
    features: &FeatureSet,
    viewport: Option<Extent>,
    width: u32,
    height: u32,
    padding_x: u32,
    padding_y: u32,
    zoom_range: ZoomRange,
    tile_size: u32,
) -> u8 {
    for zoom in (zoom_range.min..=zoom_range.max).rev() {
        let Some(extent) = determine_extent(features, viewport, Some(zoom), tile_size) else {
            break;
        };

        let required_width =
            (lon_to_x(extent.max_lon, zoom) - lon_to_x(extent.min_lon, zoom)) * tile_size as f64;
        if required_width > width as f64 - 2. * padding_x as f64 {
            continue;
        }

        let required_height =
            (lat_to_y(extent.min_lat, zoom) - lat_to_y(extent.max_lat, zoom)) * tile_size as f64;
        if required_height > height as f64 - 2. * padding_y as f64 {
            continue;
        }

        return zoom;
    }
    zoom_range.min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSet;
    use crate::position::lon_lat;
    use crate::{Line, Marker, MultiPolygon};

    fn line_features(coords: Vec<Position>) -> FeatureSet {
        let mut features = FeatureSet::default();
        features.lines.push(Line::new(coords));
        features
    }

    #[test]
    fn extent_of_lines_is_ordered() {
        let features = line_features(vec![
            lon_lat(13.4, 52.5),
            lon_lat(13.5, 52.4),
            lon_lat(13.3, 52.6),
        ]);

        let extent = determine_extent(&features, None, None, 256).unwrap();
        assert!(extent.min_lon <= extent.max_lon);
        assert!(extent.min_lat <= extent.max_lat);
        assert_eq!(extent, Extent::new(13.3, 52.4, 13.5, 52.6));
    }

    #[test]
    fn multipolygon_rings_are_flattened_before_min_max() {
        let mut features = FeatureSet::default();
        features.multipolygons.push(MultiPolygon::new(vec![
            vec![lon_lat(10., 50.), lon_lat(11., 51.), lon_lat(10.5, 50.5)],
            vec![lon_lat(-3., 40.), lon_lat(-2., 41.), lon_lat(-2.5, 40.5)],
        ]));

        let extent = determine_extent(&features, None, None, 256).unwrap();
        assert_eq!(extent, Extent::new(-3., 40., 11., 51.));
    }

    #[test]
    fn empty_features_have_no_extent() {
        let features = FeatureSet::default();
        assert!(determine_extent(&features, None, None, 256).is_none());
    }

    #[test]
    fn marker_is_a_point_without_zoom_and_a_box_with_one() {
        let mut features = FeatureSet::default();
        features
            .markers
            .push(Marker::new(lon_lat(13.4, 52.5), "pin.png").size(48, 48));

        let point = determine_extent(&features, None, None, 256).unwrap();
        assert_eq!(point, Extent::new(13.4, 52.5, 13.4, 52.5));

        let boxed = determine_extent(&features, None, Some(12), 256).unwrap();
        assert!(boxed.min_lon < point.min_lon);
        assert!(boxed.max_lon > point.max_lon);
        assert!(boxed.min_lat < point.min_lat);
        assert!(boxed.max_lat > point.max_lat);
    }

    #[test]
    fn chosen_zoom_fits_the_padded_canvas() {
        let features = line_features(vec![lon_lat(11.414795, 51.835778), lon_lat(11.645164, 51.733833)]);
        let (width, height, padding_x, padding_y) = (600, 400, 20, 20);
        let zoom_range = ZoomRange::default();

        let zoom = calculate_zoom(
            &features, None, width, height, padding_x, padding_y, zoom_range, 256,
        );
        assert!(zoom >= zoom_range.min && zoom <= zoom_range.max);

        let extent = determine_extent(&features, None, Some(zoom), 256).unwrap();
        let required_width =
            (lon_to_x(extent.max_lon, zoom) - lon_to_x(extent.min_lon, zoom)) * 256.;
        let required_height =
            (lat_to_y(extent.min_lat, zoom) - lat_to_y(extent.max_lat, zoom)) * 256.;
        assert!(required_width <= (width - 2 * padding_x) as f64);
        assert!(required_height <= (height - 2 * padding_y) as f64);

        // And the next zoom in would not have fit.
        let extent = determine_extent(&features, None, Some(zoom + 1), 256).unwrap();
        let required_width =
            (lon_to_x(extent.max_lon, zoom + 1) - lon_to_x(extent.min_lon, zoom + 1)) * 256.;
        let required_height =
            (lat_to_y(extent.min_lat, zoom + 1) - lat_to_y(extent.max_lat, zoom + 1)) * 256.;
        assert!(
            required_width > (width - 2 * padding_x) as f64
                || required_height > (height - 2 * padding_y) as f64
        );
    }

    #[test]
    fn oversized_features_fall_back_to_the_minimum_zoom() {
        let features = line_features(vec![lon_lat(-170., -80.), lon_lat(170., 80.)]);
        let zoom = calculate_zoom(&features, None, 100, 100, 0, 0, ZoomRange::default(), 256);
        assert_eq!(zoom, ZoomRange::default().min);
    }
}

#![doc = include_str!("../README.md")]
#![deny(clippy::unwrap_used, rustdoc::broken_intra_doc_links)]

mod canvas;
mod error;
mod extent;
mod features;
mod fetch;
mod loader;
mod map;
mod mercator;
mod position;
mod sources;
mod vector;

pub use canvas::Canvas;
pub use error::{Error, Result};
pub use extent::{Extent, ZoomRange};
pub use features::{Anchor, Bound, Circle, Line, Marker, MultiPolygon, ResizeMode, Text};
pub use image::ImageFormat;
pub use map::{StaticMap, StaticMapOptions};
pub use mercator::{lat_to_y, lon_to_x, meters_to_pixels, total_tiles, x_to_lon, y_to_lat, TileId};
pub use position::{lat_lon, lon_lat, Position};
pub use reqwest::header::{HeaderMap, HeaderValue};

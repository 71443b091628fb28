//! Resolve marker icons: load every distinct source once, then pin each marker to the canvas.

use std::collections::HashMap;

use bytes::Bytes;
use futures::future::try_join_all;

use crate::error::{Error, Result};
use crate::features::{Marker, ResizeMode};
use crate::fetch::TileFetcher;
use crate::map::RenderState;
use crate::mercator::project;

/// A marker with its icon bytes and final canvas position, ready for compositing.
///
/// `data` is shared by reference with every other marker resolved from the same source.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedMarker {
    pub data: Bytes,
    /// Top-left corner of the icon on the canvas, anchor offset already applied.
    pub left: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
    pub draw_width: Option<u32>,
    pub draw_height: Option<u32>,
    pub resize_mode: ResizeMode,
}

/// Load all marker icons and compute marker positions.
///
/// Icons load concurrently, deduplicated by source. Any single failing icon fails the whole
/// load; markers are essential annotations, unlike basemap tiles. Positions are computed only
/// after every icon has resolved, so each marker sees fully loaded image data.
pub(crate) async fn load_markers(
    markers: &[Marker],
    fetcher: &TileFetcher,
    state: &RenderState,
) -> Result<Vec<ResolvedMarker>> {
    let mut sources: Vec<&str> = Vec::new();
    for marker in markers {
        if !sources.contains(&marker.source.as_str()) {
            sources.push(&marker.source);
        }
    }

    let icons: HashMap<String, Bytes> =
        try_join_all(sources.iter().map(|source| load_icon(source, fetcher)))
            .await?
            .into_iter()
            .collect();

    let mut resolved = Vec::with_capacity(markers.len());
    for marker in markers {
        let data = icons[marker.source.as_str()].clone();

        let (width, height) = match (marker.width, marker.height) {
            (Some(width), Some(height)) => (width, height),
            _ => probe_size(marker, &data)?,
        };
        if width == 0 || height == 0 {
            return Err(Error::MarkerSize(marker.source.clone()));
        }

        let (anchor_x, anchor_y) = marker.anchor(width, height);
        let (x, y) = project(marker.coord, state.zoom);
        resolved.push(ResolvedMarker {
            data,
            left: (state.x_to_px(x) - anchor_x).round() as i64,
            top: (state.y_to_px(y) - anchor_y).round() as i64,
            width,
            height,
            draw_width: marker.draw_width,
            draw_height: marker.draw_height,
            resize_mode: marker.resize_mode,
        });
    }

    Ok(resolved)
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn load_icon(source: &str, fetcher: &TileFetcher) -> Result<(String, Bytes)> {
    log::debug!("Loading marker icon '{}'.", source);

    let bytes = if is_remote(source) {
        fetcher
            .fetch_bytes(source)
            .await
            .map_err(|e| Error::MarkerLoad {
                source_ref: source.to_owned(),
                reason: e.to_string(),
            })?
    } else {
        Bytes::from(
            tokio::fs::read(source)
                .await
                .map_err(|e| Error::MarkerLoad {
                    source_ref: source.to_owned(),
                    reason: e.to_string(),
                })?,
        )
    };

    Ok((source.to_owned(), bytes))
}

/// Take missing dimensions from the decoded image. An icon that supplies neither a size nor
/// decodable image data is a configuration error.
fn probe_size(marker: &Marker, data: &Bytes) -> Result<(u32, u32)> {
    let image =
        image::load_from_memory(data).map_err(|_| Error::MarkerSize(marker.source.clone()))?;
    Ok((
        marker.width.unwrap_or(image.width()),
        marker.height.unwrap_or(image.height()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::lon_lat;
    use image::{Rgba, RgbaImage};
    use reqwest::header::HeaderMap;
    use std::io::Cursor;
    use std::time::Duration;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 255]));
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn fetcher() -> TileFetcher {
        TileFetcher::new(Duration::from_secs(5), &HeaderMap::new(), 2).unwrap()
    }

    fn state() -> RenderState {
        // Zoom 1, centered on (0°, 0°), 100x100 canvas.
        RenderState {
            zoom: 1,
            center_x: 1.,
            center_y: 1.,
            width: 100,
            height: 100,
            tile_size: 256,
        }
    }

    fn temp_icon(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("mapsnap-{}-{}", std::process::id(), name));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn local_icon_with_probed_size_and_anchor() {
        let path = temp_icon("probe.png", &png_bytes(16, 24));
        let markers = [Marker::new(lon_lat(0., 0.), path.to_string_lossy())];

        let resolved = load_markers(&markers, &fetcher(), &state()).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!((resolved[0].width, resolved[0].height), (16, 24));
        // Canvas center is (50, 50); bottom-center anchor of a 16x24 icon.
        assert_eq!(resolved[0].left, 50 - 8);
        assert_eq!(resolved[0].top, 50 - 24);
    }

    #[tokio::test]
    async fn missing_icon_fails_the_load() {
        let markers = [Marker::new(lon_lat(0., 0.), "/nonexistent/pin.png").size(8, 8)];
        let result = load_markers(&markers, &fetcher(), &state()).await;
        assert!(matches!(result, Err(Error::MarkerLoad { .. })));
    }

    #[tokio::test]
    async fn undecodable_icon_without_size_is_a_configuration_error() {
        let path = temp_icon("garbage.bin", b"not an image");
        let markers = [Marker::new(lon_lat(0., 0.), path.to_string_lossy())];
        let result = load_markers(&markers, &fetcher(), &state()).await;
        assert!(matches!(result, Err(Error::MarkerSize(_))));
    }

    #[tokio::test]
    async fn shared_source_is_read_once_and_bytes_are_shared() {
        let server = mocktile::Server::bind().await;
        server.respond("/pin.png", png_bytes(8, 8));
        let url = format!("{}/pin.png", server.url());

        let markers = [
            Marker::new(lon_lat(0., 0.), &url),
            Marker::new(lon_lat(1., 1.), &url),
            Marker::new(lon_lat(2., 2.), &url),
        ];

        let resolved = load_markers(&markers, &fetcher(), &state()).await.unwrap();
        assert_eq!(server.hits("/pin.png"), 1);

        // `Bytes` clones point at the same buffer.
        let first = resolved[0].data.as_ptr();
        assert!(resolved.iter().all(|m| m.data.as_ptr() == first));
    }
}

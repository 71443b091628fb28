//! The output raster buffer and the compositing operations that fill it.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, ImageFormat, RgbaImage};

use crate::error::{Error, Result};
use crate::features::ResizeMode;
use crate::fetch::FetchedTile;
use crate::loader::ResolvedMarker;

/// The rendered map image.
///
/// Starts out fully transparent and is progressively overwritten by the base layer and the
/// feature layers. Once `render` returns it, it only hands out pixels and encodings.
pub struct Canvas {
    image: RgbaImage,
    quality: u8,
}

impl Canvas {
    pub(crate) fn new(width: u32, height: u32, quality: u8) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions);
        }
        Ok(Self {
            image: RgbaImage::new(width, height),
            quality,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw pixel access, mostly useful for tests and post-processing.
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }

    /// Composite the fetched tiles at their destination boxes. Tiles that fail to decode are
    /// skipped like tiles that failed to download; the hole stays transparent.
    pub(crate) fn draw_base_layer(&mut self, tiles: &[FetchedTile]) {
        for tile in tiles {
            let decoded = match image::load_from_memory(&tile.body) {
                Ok(decoded) => decoded.to_rgba8(),
                Err(e) => {
                    log::warn!("Skipping undecodable tile '{}': {}", tile.url, e);
                    continue;
                }
            };
            self.draw_tile(&decoded, tile.dest.left as i64, tile.dest.top as i64);
        }
    }

    /// Blit the part of the tile that overlaps the canvas. Negative offsets clip the source
    /// origin, overflow clips the extracted width/height, and a non-positive overlap means
    /// the tile misses the canvas entirely and is skipped.
    fn draw_tile(&mut self, tile: &RgbaImage, left: i64, top: i64) {
        let (tile_width, tile_height) = (tile.width() as i64, tile.height() as i64);
        let (canvas_width, canvas_height) =
            (self.image.width() as i64, self.image.height() as i64);

        let source_x = (-left).max(0);
        let source_y = (-top).max(0);
        let width = tile_width - source_x - (left + tile_width - canvas_width).max(0);
        let height = tile_height - source_y - (top + tile_height - canvas_height).max(0);
        if width <= 0 || height <= 0 {
            return;
        }

        let part = imageops::crop_imm(
            tile,
            source_x as u32,
            source_y as u32,
            width as u32,
            height as u32,
        )
        .to_image();
        imageops::overlay(&mut self.image, &part, left.max(0), top.max(0));
    }

    /// Blend a canvas-sized overlay (one rasterized vector chunk) over the current content.
    pub(crate) fn composite(&mut self, overlay: &RgbaImage) {
        imageops::overlay(&mut self.image, overlay, 0, 0);
    }

    /// Draw resolved markers at their pixel positions. Markers entirely outside the canvas
    /// are skipped; partially visible ones are clipped by the blit.
    pub(crate) fn draw_markers(&mut self, markers: &[ResolvedMarker]) -> Result<()> {
        for marker in markers {
            let icon = image::load_from_memory(&marker.data)?;
            let icon = resize_icon(icon, marker);

            let (width, height) = (icon.width() as i64, icon.height() as i64);
            let outside = marker.left >= self.image.width() as i64
                || marker.top >= self.image.height() as i64
                || marker.left + width <= 0
                || marker.top + height <= 0;
            if outside {
                log::debug!("Skipping marker outside the canvas at {:?}.", (marker.left, marker.top));
                continue;
            }

            imageops::overlay(&mut self.image, &icon.to_rgba8(), marker.left, marker.top);
        }
        Ok(())
    }

    /// Encode the canvas. JPEG has no alpha channel, so the image is reduced to RGB first.
    pub fn buffer(&self, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        match format {
            ImageFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgba8(self.image.clone()).to_rgb8();
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, self.quality))?;
            }
            format => self.image.write_to(&mut buffer, format)?,
        }
        Ok(buffer.into_inner())
    }

    /// Write the canvas to a file, picking the format from the extension (`png`, `jpg`,
    /// `jpeg`, `webp`; anything else encodes as PNG).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        let format = match extension.as_deref() {
            Some("jpg" | "jpeg") => ImageFormat::Jpeg,
            Some("webp") => ImageFormat::WebP,
            _ => ImageFormat::Png,
        };
        std::fs::write(path, self.buffer(format)?)?;
        Ok(())
    }
}

fn resize_icon(icon: DynamicImage, marker: &ResolvedMarker) -> DynamicImage {
    let width = marker.draw_width.unwrap_or(marker.width);
    let height = marker.draw_height.unwrap_or(marker.height);
    if icon.width() == width && icon.height() == height {
        return icon;
    }

    let filter = imageops::FilterType::Lanczos3;
    match marker.resize_mode {
        ResizeMode::Cover => icon.resize_to_fill(width, height, filter),
        ResizeMode::Contain => icon.resize(width, height, filter),
        ResizeMode::Stretch => icon.resize_exact(width, height, filter),
    }
}

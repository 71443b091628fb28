//! The static map renderer: collects features, resolves the viewport, and drives the fetch
//! and compositing pipeline.

use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::canvas::Canvas;
use crate::error::{Error, Result};
use crate::extent::{calculate_zoom, determine_extent, Extent, ZoomRange};
use crate::features::{Bound, Circle, FeatureSet, Line, Marker, MultiPolygon, Text};
use crate::fetch::{PixelBox, TileDescriptor, TileFetcher};
use crate::loader::load_markers;
use crate::mercator::{lat_to_y, lon_to_x, total_tiles, TileId};
use crate::position::Position;
use crate::sources::{TileServer, OSM_TILE_URL};
use crate::vector::{self, Rasterizer, RENDER_CHUNK_SIZE};

/// Renderer configuration. `..Default::default()` fills the usual OpenStreetMap setup.
#[derive(Debug, Clone)]
pub struct StaticMapOptions {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Minimum horizontal distance kept between fitted features and the canvas edge.
    pub padding_x: u32,
    pub padding_y: u32,
    /// Tile URL template with `{z}`/`{x}`/`{y}`/`{quadkey}`/`{s}` tokens. `None` renders
    /// the features without any base layer.
    pub tile_url: Option<String>,
    pub tile_size: u32,
    /// Values for the `{s}` template token.
    pub tile_subdomains: Vec<String>,
    pub tile_request_timeout: Duration,
    /// Extra headers sent with every tile and icon request.
    pub tile_request_headers: HeaderMap,
    /// Concurrent downloads per batch; each batch completes before the next starts. Zero
    /// disables batching entirely.
    pub tile_request_limit: usize,
    /// Flip the tile y coordinate for TMS-style servers.
    pub reverse_y: bool,
    /// Zoom levels considered when fitting features onto the canvas.
    pub zoom_range: ZoomRange,
    /// JPEG encode quality, 1-100.
    pub quality: u8,
}

impl Default for StaticMapOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            padding_x: 0,
            padding_y: 0,
            tile_url: Some(OSM_TILE_URL.to_owned()),
            tile_size: 256,
            tile_subdomains: Vec::new(),
            tile_request_timeout: Duration::from_secs(30),
            tile_request_headers: HeaderMap::new(),
            tile_request_limit: 2,
            reverse_y: false,
            zoom_range: ZoomRange::default(),
            quality: 100,
        }
    }
}

/// Per-render context: the resolved zoom and center plus the canvas geometry. Built fresh for
/// every render call and discarded with it; nothing carries over between renders.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderState {
    pub zoom: u8,
    /// Canvas center in fractional tile coordinates.
    pub center_x: f64,
    pub center_y: f64,
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
}

impl RenderState {
    /// Map a fractional tile x coordinate onto a canvas pixel column. The result is rounded
    /// half away from zero; everything before this point stays floating.
    pub fn x_to_px(&self, x: f64) -> f64 {
        ((x - self.center_x) * self.tile_size as f64 + self.width as f64 / 2.).round()
    }

    pub fn y_to_px(&self, y: f64) -> f64 {
        ((y - self.center_y) * self.tile_size as f64 + self.height as f64 / 2.).round()
    }
}

enum Viewport {
    /// Fit the viewport around all added features.
    Fit,
    /// Fit around an explicit bounding box (plus any features).
    Bounds(Extent),
    /// Explicit center and zoom.
    Center(Position, u8),
}

/// Renders a static raster map.
///
/// Populate it with features, then call one of the `render` methods. Rendering never mutates
/// the map, so the same instance can render repeatedly (or with different viewports) and will
/// produce the same image for the same inputs, network permitting.
pub struct StaticMap {
    options: StaticMapOptions,
    features: FeatureSet,
}

impl StaticMap {
    pub fn new(options: StaticMapOptions) -> Result<Self> {
        if options.width == 0 || options.height == 0 {
            return Err(Error::InvalidDimensions);
        }
        if options.zoom_range.min > options.zoom_range.max {
            return Err(Error::InvalidZoomRange(options.zoom_range));
        }
        Ok(Self {
            options,
            features: FeatureSet::default(),
        })
    }

    pub fn add_line(&mut self, line: Line) {
        self.features.lines.push(line);
    }

    /// Polygons share the line collection; a closed coordinate ring with a fill color is what
    /// makes the difference.
    pub fn add_polygon(&mut self, polygon: Line) {
        self.features.lines.push(polygon);
    }

    pub fn add_multi_polygon(&mut self, multipolygon: MultiPolygon) {
        self.features.multipolygons.push(multipolygon);
    }

    pub fn add_marker(&mut self, marker: Marker) {
        self.features.markers.push(marker);
    }

    pub fn add_circle(&mut self, circle: Circle) {
        self.features.circles.push(circle);
    }

    pub fn add_text(&mut self, text: Text) {
        self.features.texts.push(text);
    }

    /// Force coordinates into the fitted viewport without drawing anything.
    pub fn add_bound(&mut self, bound: Bound) {
        self.features.bounds.push(bound);
    }

    /// Render with the viewport fitted around all added features.
    ///
    /// Fails with [`Error::EmptyMap`] when nothing with a geographical extent has been added;
    /// use [`StaticMap::render_center`] for feature-less maps.
    pub async fn render(&self) -> Result<Canvas> {
        self.render_viewport(Viewport::Fit).await
    }

    /// Render the given bounding box, picking the highest zoom at which it fits.
    pub async fn render_bounds(&self, bounds: Extent) -> Result<Canvas> {
        self.render_viewport(Viewport::Bounds(bounds)).await
    }

    /// Render around an explicit center coordinate and zoom level. The zoom is clamped to the
    /// configured range.
    pub async fn render_center(&self, center: Position, zoom: u8) -> Result<Canvas> {
        self.render_viewport(Viewport::Center(center, zoom)).await
    }

    async fn render_viewport(&self, viewport: Viewport) -> Result<Canvas> {
        let state = self.resolve(viewport)?;
        log::debug!(
            "Rendering {}x{} at zoom {}.",
            state.width,
            state.height,
            state.zoom
        );

        let fetcher = TileFetcher::new(
            self.options.tile_request_timeout,
            &self.options.tile_request_headers,
            self.options.tile_request_limit,
        )?;

        // Tiles and marker icons download concurrently; both must be in before compositing.
        let (tiles, markers) = futures::join!(
            fetcher.fetch_tiles(self.tile_grid(&state)),
            load_markers(&self.features.markers, &fetcher, &state),
        );
        let markers = markers?;

        let mut canvas = Canvas::new(state.width, state.height, self.options.quality)?;
        canvas.draw_base_layer(&tiles);

        // Fixed layer order: lines, multipolygons, markers, text, circles. Annotations sit
        // above the basemap and above the geometry below them.
        let rasterizer = Rasterizer::new();

        let lines: Vec<String> = self
            .features
            .lines
            .iter()
            .map(|line| vector::line_element(line, &state))
            .collect();
        draw_chunks(&mut canvas, &rasterizer, &lines)?;

        let multipolygons: Vec<String> = self
            .features
            .multipolygons
            .iter()
            .map(|multipolygon| vector::multipolygon_element(multipolygon, &state))
            .collect();
        draw_chunks(&mut canvas, &rasterizer, &multipolygons)?;

        canvas.draw_markers(&markers)?;

        let texts: Vec<String> = self
            .features
            .texts
            .iter()
            .map(|text| vector::text_element(text, &state))
            .collect();
        draw_chunks(&mut canvas, &rasterizer, &texts)?;

        let circles: Vec<String> = self
            .features
            .circles
            .iter()
            .map(|circle| vector::circle_element(circle, &state))
            .collect();
        draw_chunks(&mut canvas, &rasterizer, &circles)?;

        Ok(canvas)
    }

    fn resolve(&self, viewport: Viewport) -> Result<RenderState> {
        let ZoomRange { min, max } = self.options.zoom_range;

        let (zoom, center) = match viewport {
            Viewport::Center(center, zoom) => (zoom.clamp(min, max), center),
            Viewport::Fit => self.fit(None)?,
            Viewport::Bounds(bounds) => self.fit(Some(bounds))?,
        };

        Ok(RenderState {
            zoom,
            center_x: lon_to_x(center.x(), zoom),
            center_y: lat_to_y(center.y(), zoom),
            width: self.options.width,
            height: self.options.height,
            tile_size: self.options.tile_size,
        })
    }

    /// Pick the tightest zoom for the features (and the optional explicit bounding box), then
    /// center on their combined extent.
    fn fit(&self, bounds: Option<Extent>) -> Result<(u8, Position)> {
        let zoom = calculate_zoom(
            &self.features,
            bounds,
            self.options.width,
            self.options.height,
            self.options.padding_x,
            self.options.padding_y,
            self.options.zoom_range,
            self.options.tile_size,
        );
        let extent = determine_extent(&self.features, bounds, Some(zoom), self.options.tile_size)
            .ok_or(Error::EmptyMap)?;
        Ok((zoom, extent.center()))
    }

    /// Tile descriptors covering the canvas, row-major. The fetch preserves this order, which
    /// keeps the composite deterministic regardless of download timing.
    fn tile_grid(&self, state: &RenderState) -> Vec<TileDescriptor> {
        let Some(template) = &self.options.tile_url else {
            return Vec::new();
        };
        let server = TileServer::new(template.clone(), self.options.tile_subdomains.clone());

        let tile_size = state.tile_size as f64;
        let x_min = (state.center_x - 0.5 * state.width as f64 / tile_size).floor() as i64;
        let x_max = (state.center_x + 0.5 * state.width as f64 / tile_size).ceil() as i64;
        let y_min = (state.center_y - 0.5 * state.height as f64 / tile_size).floor() as i64;
        let y_max = (state.center_y + 0.5 * state.height as f64 / tile_size).ceil() as i64;

        let total = total_tiles(state.zoom) as i64;
        let mut descriptors = Vec::new();

        for y in y_min..y_max {
            // The y axis does not wrap; rows beyond the poles stay transparent.
            if y < 0 || y >= total {
                continue;
            }
            for x in x_min..x_max {
                // x may have crossed the date line.
                let tile_x = x.rem_euclid(total) as u32;
                let tile_y = if self.options.reverse_y {
                    (total - 1 - y) as u32
                } else {
                    y as u32
                };

                descriptors.push(TileDescriptor {
                    url: server.tile_url(TileId {
                        x: tile_x,
                        y: tile_y,
                        zoom: state.zoom,
                    }),
                    dest: PixelBox {
                        left: state.x_to_px(x as f64) as i32,
                        top: state.y_to_px(y as f64) as i32,
                        right: state.x_to_px((x + 1) as f64) as i32,
                        bottom: state.y_to_px((y + 1) as f64) as i32,
                    },
                });
            }
        }
        descriptors
    }
}

fn draw_chunks(canvas: &mut Canvas, rasterizer: &Rasterizer, elements: &[String]) -> Result<()> {
    // Each chunk is rasterized against the current canvas state in sequence; later chunks
    // must draw over earlier ones.
    for chunk in elements.chunks(RENDER_CHUNK_SIZE) {
        let overlay = rasterizer.rasterize(chunk, canvas.width(), canvas.height())?;
        canvas.composite(&overlay);
    }
    Ok(())
}

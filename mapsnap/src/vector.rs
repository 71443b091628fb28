//! Rasterize vector features by way of SVG.
//!
//! Features are projected to pixel space, written out as SVG elements, and rasterized in
//! chunks at canvas size. Each chunk becomes one overlay for the compositor, so later
//! features always draw over earlier ones.

use std::sync::{Arc, OnceLock};

use image::{Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};

use crate::error::{Error, Result};
use crate::features::{Circle, Line, MultiPolygon, Text};
use crate::map::RenderState;
use crate::mercator::project;
use crate::position::Position;

/// Upper bound on elements per SVG document, keeping single rasterizer calls reasonable for
/// very dense feature sets.
pub(crate) const RENDER_CHUNK_SIZE: usize = 1000;

fn to_pixel(position: Position, state: &RenderState) -> (f64, f64) {
    let (x, y) = project(position, state.zoom);
    (state.x_to_px(x), state.y_to_px(y))
}

fn points_attribute(coords: &[Position], state: &RenderState) -> String {
    coords
        .iter()
        .map(|&coord| {
            let (x, y) = to_pixel(coord, state);
            format!("{x},{y}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn line_element(line: &Line, state: &RenderState) -> String {
    let shape = if line.is_closed() { "polygon" } else { "polyline" };
    format!(
        r#"<{shape} points="{points}" stroke="{stroke}" fill="{fill}" stroke-width="{width}"/>"#,
        points = points_attribute(&line.coords, state),
        stroke = line.color,
        fill = line.fill.as_deref().unwrap_or("none"),
        width = line.width,
    )
}

pub(crate) fn multipolygon_element(multipolygon: &MultiPolygon, state: &RenderState) -> String {
    let path = multipolygon
        .coords
        .iter()
        .filter(|ring| !ring.is_empty())
        .map(|ring| {
            let mut d = String::new();
            for (i, &point) in ring.iter().enumerate() {
                let (x, y) = to_pixel(point, state);
                let command = if i == 0 { "M" } else { " L" };
                d.push_str(&format!("{command} {x} {y}"));
            }
            d.push_str(" Z");
            d
        })
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        r#"<path d="{path}" fill-rule="evenodd" stroke="{stroke}" fill="{fill}" stroke-width="{width}"/>"#,
        stroke = multipolygon.color,
        fill = multipolygon.fill.as_deref().unwrap_or("none"),
        width = multipolygon.width,
    )
}

pub(crate) fn circle_element(circle: &Circle, state: &RenderState) -> String {
    let (x, y) = to_pixel(circle.coord, state);
    let radius = crate::mercator::meters_to_pixels(circle.radius, state.zoom, circle.coord.y());
    format!(
        r#"<circle cx="{x}" cy="{y}" r="{radius}" stroke="{stroke}" fill="{fill}" stroke-width="{width}"/>"#,
        stroke = circle.color,
        fill = circle.fill,
        width = circle.width,
    )
}

pub(crate) fn text_element(text: &Text, state: &RenderState) -> String {
    let (x, y) = to_pixel(text.coord, state);
    format!(
        r#"<text x="{x}" y="{y}" font-family="{font}" font-size="{size}pt" text-anchor="{anchor}" stroke="{stroke}" fill="{fill}" stroke-width="{width}">{body}</text>"#,
        x = x + text.offset_x,
        y = y + text.offset_y,
        font = text.font,
        size = text.size,
        anchor = text.anchor.as_svg(),
        stroke = text.color,
        fill = text.fill,
        width = text.width,
        body = xml_escape(&text.text),
    )
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Rasterizes SVG documents at canvas size. One instance per render; the font database is
/// loaded once per process and shared.
pub(crate) struct Rasterizer {
    options: usvg::Options<'static>,
}

impl Rasterizer {
    pub fn new() -> Self {
        let mut options = usvg::Options::default();
        options.fontdb = font_db();
        Self { options }
    }

    /// Wrap the elements into an SVG document and rasterize it to an RGBA overlay of the
    /// given size.
    pub fn rasterize(&self, elements: &[String], width: u32, height: u32) -> Result<RgbaImage> {
        let svg = format!(
            r#"<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg">{body}</svg>"#,
            body = elements.concat(),
        );

        let tree =
            usvg::Tree::from_str(&svg, &self.options).map_err(|e| Error::Svg(e.to_string()))?;
        let mut pixmap =
            tiny_skia::Pixmap::new(width, height).ok_or(Error::InvalidDimensions)?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        let mut image = RgbaImage::new(width, height);
        for (pixel, premultiplied) in image.pixels_mut().zip(pixmap.pixels().iter()) {
            let color = premultiplied.demultiply();
            *pixel = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
        }
        Ok(image)
    }
}

fn font_db() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            Arc::new(db)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::lon_lat;

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

    #[test]
    fn open_and_closed_lines_use_different_elements() {
        let open = Line::new(vec![lon_lat(0., 0.), lon_lat(1., 1.)]);
        assert!(line_element(&open, &state()).starts_with("<polyline"));

        let closed = Line::new(vec![lon_lat(0., 0.), lon_lat(1., 1.), lon_lat(0., 0.)]);
        assert!(line_element(&closed, &state()).starts_with("<polygon"));
    }

    #[test]
    fn rasterized_rect_lands_on_its_pixels() {
        let rasterizer = Rasterizer::new();
        let element =
            r##"<rect x="10" y="10" width="20" height="20" fill="#FF0000"/>"##.to_owned();
        let image = rasterizer.rasterize(&[element], 100, 100).unwrap();

        assert_eq!(image.get_pixel(20, 20).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(50, 50).0[3], 0);
    }

    #[test]
    fn rasterizing_nothing_is_fully_transparent() {
        let image = Rasterizer::new().rasterize(&[], 10, 10).unwrap();
        assert!(image.pixels().all(|pixel| pixel.0[3] == 0));
    }

    #[test]
    fn text_is_escaped() {
        let text = Text::new(lon_lat(0., 0.), "a < b & c");
        let element = text_element(&text, &state());
        assert!(element.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn filled_circle_covers_its_center() {
        let circle = Circle::new(lon_lat(0., 0.), 500_000.)
            .unwrap()
            .fill("#00FF00")
            .color("#00FF00");
        let element = circle_element(&circle, &state());
        let image = Rasterizer::new().rasterize(&[element], 100, 100).unwrap();

        // Canvas center is (50, 50).
        assert_eq!(image.get_pixel(50, 50).0, [0, 255, 0, 255]);
    }
}

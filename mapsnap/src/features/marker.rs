use crate::position::Position;

/// How a marker icon is scaled when the configured draw size differs from the icon's intrinsic
/// size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// Scale preserving aspect ratio so the draw box is fully covered, cropping the overflow.
    #[default]
    Cover,
    /// Scale preserving aspect ratio so the icon fits inside the draw box.
    Contain,
    /// Scale to the draw box exactly, ignoring aspect ratio.
    Stretch,
}

/// An icon pinned to a geographical coordinate.
///
/// The icon source may be a local file path or an `http(s)` URL. Width and height may be left
/// out, in which case they are probed from the decoded image when the map renders. The anchor
/// offset defaults to the bottom-center of the icon, the usual "pin point" of marker artwork.
#[derive(Debug, Clone)]
pub struct Marker {
    pub coord: Position,
    /// Local path or URL of the icon image.
    pub source: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Anchor x within the icon, in pixels from its left edge. Defaults to `width / 2`.
    pub offset_x: Option<f64>,
    /// Anchor y within the icon, in pixels from its top edge. Defaults to `height`.
    pub offset_y: Option<f64>,
    /// Optional on-canvas width; the icon is resized when this differs from its size.
    pub draw_width: Option<u32>,
    pub draw_height: Option<u32>,
    pub resize_mode: ResizeMode,
}

impl Marker {
    pub fn new(coord: Position, source: impl Into<String>) -> Self {
        Self {
            coord,
            source: source.into(),
            width: None,
            height: None,
            offset_x: None,
            offset_y: None,
            draw_width: None,
            draw_height: None,
            resize_mode: ResizeMode::default(),
        }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn offset(mut self, x: f64, y: f64) -> Self {
        self.offset_x = Some(x);
        self.offset_y = Some(y);
        self
    }

    pub fn draw_size(mut self, width: u32, height: u32) -> Self {
        self.draw_width = Some(width);
        self.draw_height = Some(height);
        self
    }

    pub fn resize_mode(mut self, mode: ResizeMode) -> Self {
        self.resize_mode = mode;
        self
    }

    pub(crate) fn anchor(&self, width: u32, height: u32) -> (f64, f64) {
        (
            self.offset_x.unwrap_or(width as f64 / 2.),
            self.offset_y.unwrap_or(height as f64),
        )
    }

    /// Pixel distances from the anchor to the icon edges: `[left, below, right, above]`.
    /// `None` until the icon size is known.
    pub(crate) fn extent_px(&self) -> Option<[f64; 4]> {
        let (width, height) = (self.width?, self.height?);
        let (offset_x, offset_y) = self.anchor(width, height);
        Some([
            offset_x,
            height as f64 - offset_y,
            width as f64 - offset_x,
            offset_y,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::lon_lat;

    #[test]
    fn anchor_defaults_to_bottom_center() {
        let marker = Marker::new(lon_lat(0., 0.), "pin.png").size(24, 32);
        assert_eq!(marker.anchor(24, 32), (12., 32.));
        assert_eq!(marker.extent_px(), Some([12., 0., 12., 32.]));
    }

    #[test]
    fn no_footprint_without_a_size() {
        let marker = Marker::new(lon_lat(0., 0.), "pin.png");
        assert_eq!(marker.extent_px(), None);
    }

    #[test]
    fn explicit_offset_wins() {
        let marker = Marker::new(lon_lat(0., 0.), "pin.png")
            .size(24, 32)
            .offset(0., 16.);
        assert_eq!(marker.extent_px(), Some([0., 16., 24., 16.]));
    }
}

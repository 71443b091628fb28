use super::DEFAULT_COLOR;
use crate::extent::Extent;
use crate::position::Position;

/// A polygon with multiple rings, drawn as a single path so that inner rings become holes
/// under the even-odd fill rule.
#[derive(Debug, Clone)]
pub struct MultiPolygon {
    pub coords: Vec<Vec<Position>>,
    pub color: String,
    pub fill: Option<String>,
    pub width: f64,
}

impl MultiPolygon {
    pub fn new(coords: Vec<Vec<Position>>) -> Self {
        Self {
            coords,
            color: DEFAULT_COLOR.to_owned(),
            fill: None,
            width: 3.,
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    /// Bounding box over all rings. The rings are flattened into one sequence of positions
    /// first; taking min/max ring-by-ring and unioning partial results is where historical
    /// implementations went wrong.
    pub(crate) fn extent(&self) -> Option<Extent> {
        Extent::from_positions(self.coords.iter().flatten().copied())
    }
}

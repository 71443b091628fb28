//! The feature kinds that can be added to a map, and the collection holding them.

mod bound;
mod circle;
mod line;
mod marker;
mod multipolygon;
mod text;

pub use bound::Bound;
pub use circle::Circle;
pub use line::Line;
pub use marker::{Marker, ResizeMode};
pub use multipolygon::MultiPolygon;
pub use text::{Anchor, Text};

/// All features added to a [`crate::StaticMap`], grouped by kind. The grouping is what fixes
/// the draw order; within a kind, features draw in insertion order.
#[derive(Debug, Default)]
pub(crate) struct FeatureSet {
    pub lines: Vec<Line>,
    pub multipolygons: Vec<MultiPolygon>,
    pub markers: Vec<Marker>,
    pub circles: Vec<Circle>,
    pub texts: Vec<Text>,
    pub bounds: Vec<Bound>,
}

/// Borrowed view over any feature kind, for code that treats them uniformly (extent
/// collection). A closed set; matches must be exhaustive.
pub(crate) enum FeatureRef<'a> {
    Line(&'a Line),
    MultiPolygon(&'a MultiPolygon),
    Marker(&'a Marker),
    Circle(&'a Circle),
    Text(&'a Text),
    Bound(&'a Bound),
}

impl FeatureSet {
    pub fn iter(&self) -> impl Iterator<Item = FeatureRef<'_>> {
        let lines = self.lines.iter().map(FeatureRef::Line);
        let multipolygons = self.multipolygons.iter().map(FeatureRef::MultiPolygon);
        let markers = self.markers.iter().map(FeatureRef::Marker);
        let circles = self.circles.iter().map(FeatureRef::Circle);
        let texts = self.texts.iter().map(FeatureRef::Text);
        let bounds = self.bounds.iter().map(FeatureRef::Bound);
        lines
            .chain(multipolygons)
            .chain(markers)
            .chain(circles)
            .chain(texts)
            .chain(bounds)
    }
}

/// Default stroke color shared by lines, multipolygons, circles and text.
pub(crate) const DEFAULT_COLOR: &str = "#000000BB";

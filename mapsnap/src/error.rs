use crate::extent::ZoomRange;

/// Errors surfaced by [`crate::StaticMap`]. Individual tile fetch failures are not errors; they
/// degrade to transparent holes in the base layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot render an empty map: add features, or pass an explicit center and zoom")]
    EmptyMap,

    #[error("canvas dimensions must be non-zero")]
    InvalidDimensions,

    #[error("invalid zoom range {0:?}: min must not exceed max")]
    InvalidZoomRange(ZoomRange),

    #[error("circle radius must be a positive number of meters")]
    InvalidCircle,

    #[error(
        "marker icon {0:?} has no usable size: pass width and height, or use an image \
         with decodable dimensions"
    )]
    MarkerSize(String),

    #[error("failed to load marker icon {source_ref:?}: {reason}")]
    MarkerLoad { source_ref: String, reason: String },

    #[error("failed to rasterize vector layer: {0}")]
    Svg(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

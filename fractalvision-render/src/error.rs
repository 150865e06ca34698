use thiserror::Error;

/// Errors originating from palettes, the render pipeline and image export.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid color count: {0} (must be in 1..=4096)")]
    InvalidColorCount(usize),

    #[error("unknown color scheme: {0:?}")]
    UnknownScheme(String),

    #[error("invalid image dimensions: {width}×{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("render worker failed: {0}")]
    WorkerPanicked(String),

    #[error("unsupported export format: {0:?}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Core(#[from] fractalvision_core::CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Png(#[from] png::EncodingError),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

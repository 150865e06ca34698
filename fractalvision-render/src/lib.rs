pub mod buffer;
pub mod error;
pub mod export;
pub mod palette;
pub mod pipeline;
pub mod renderer;

pub use buffer::RenderBuffer;
pub use error::RenderError;
pub use export::{default_file_name, export_jpeg, export_png, export_result, ExportFormat, ExportMetadata};
pub use palette::{builtin_schemes, ColorScheme, Palette, Rgba, INTERIOR_COLOR};
pub use pipeline::{RenderEvent, RenderOutcome, RenderPhase, RenderPipeline, RenderSettings};
pub use renderer::{render, RenderQuality, RenderResult};

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;

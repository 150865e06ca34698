pub mod complex;
pub mod engine;
pub mod error;
pub mod fractal;
pub mod history;
pub mod julia;
pub mod mandelbrot;
pub mod selection;
pub mod viewport;

// Re-export primary types for convenience.
pub use complex::Complex;
pub use engine::EscapeTimeEngine;
pub use error::CoreError;
pub use fractal::{Fractal, FractalKind, FractalParams, IterationResult};
pub use history::{HistoryChanged, ViewHistory};
pub use julia::Julia;
pub use mandelbrot::Mandelbrot;
pub use selection::{PixelRect, ZoomRectangle};
pub use viewport::Viewport;

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;

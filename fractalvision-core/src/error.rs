use thiserror::Error;

/// Errors raised when a configuration value is rejected.
///
/// Every setter that returns one of these leaves the previous valid value in
/// place, so callers are free to ignore the error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid max iterations: {0} (must be in 1..=10000)")]
    InvalidMaxIterations(u32),

    #[error("invalid escape radius: {0} (must be positive and finite)")]
    InvalidEscapeRadius(f64),

    #[error("invalid zoom: {0} (must be positive and finite)")]
    InvalidZoom(f64),

    #[error("invalid viewport dimensions: {width}×{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid history depth: {0} (must be at least 1)")]
    InvalidHistoryDepth(usize),

    #[error("malformed viewport string: {reason}")]
    MalformedViewport { reason: String },
}

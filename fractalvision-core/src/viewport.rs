use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::complex::Complex;
use crate::error::CoreError;

/// Width of the complex plane visible at `zoom == 1.0`.
const BASE_RANGE: f64 = 4.0;

/// The rectangular window of the complex plane mapped onto the pixel grid.
///
/// At zoom 1 the real axis spans [`BASE_RANGE`] units; the imaginary span is
/// that divided by the aspect ratio. `(0, 0)` is the top-left pixel and the
/// imaginary axis increases upward, so pixel rows are flipped on the way in.
///
/// The fields are private so that `zoom > 0`, `width > 0`, `height > 0` and
/// the cached aspect ratio always hold. Setters that would break them return
/// an error and leave the viewport unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    center: Complex,
    zoom: f64,
    width: u32,
    height: u32,
    aspect_ratio: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: Complex::ZERO,
            zoom: Self::DEFAULT_ZOOM,
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            aspect_ratio: Self::DEFAULT_WIDTH as f64 / Self::DEFAULT_HEIGHT as f64,
        }
    }
}

impl Viewport {
    pub const DEFAULT_ZOOM: f64 = 1.0;
    pub const DEFAULT_WIDTH: u32 = 800;
    pub const DEFAULT_HEIGHT: u32 = 600;

    pub fn new(center: Complex, zoom: f64, width: u32, height: u32) -> crate::Result<Self> {
        check_zoom(zoom)?;
        check_dimensions(width, height)?;
        Ok(Self {
            center,
            zoom,
            width,
            height,
            aspect_ratio: width as f64 / height as f64,
        })
    }

    /// Default view (origin, zoom 1) at the given pixel size.
    pub fn with_size(width: u32, height: u32) -> crate::Result<Self> {
        Self::new(Complex::ZERO, Self::DEFAULT_ZOOM, width, height)
    }

    pub fn center(&self) -> Complex {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `width / height`, kept in sync with every dimension change.
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn set_center(&mut self, center: Complex) {
        self.center = center;
    }

    pub fn set_zoom(&mut self, zoom: f64) -> crate::Result<()> {
        check_zoom(zoom)?;
        self.zoom = zoom;
        Ok(())
    }

    pub fn set_width(&mut self, width: u32) -> crate::Result<()> {
        self.resize(width, self.height)
    }

    pub fn set_height(&mut self, height: u32) -> crate::Result<()> {
        self.resize(self.width, height)
    }

    /// Change the pixel dimensions; the plane region keeps its center and zoom.
    pub fn resize(&mut self, width: u32, height: u32) -> crate::Result<()> {
        check_dimensions(width, height)?;
        self.width = width;
        self.height = height;
        self.aspect_ratio = width as f64 / height as f64;
        Ok(())
    }

    /// Extent of the visible region along the real axis.
    pub fn range_re(&self) -> f64 {
        BASE_RANGE / self.zoom
    }

    /// Extent of the visible region along the imaginary axis.
    pub fn range_im(&self) -> f64 {
        self.range_re() / self.aspect_ratio
    }

    /// Map a pixel to its point on the complex plane.
    ///
    /// Every coordinate transform in the renderer goes through here.
    #[inline]
    pub fn pixel_to_complex(&self, px: u32, py: u32) -> Complex {
        self.subpixel_to_complex(px as f64, py as f64)
    }

    /// Like [`pixel_to_complex`](Self::pixel_to_complex) for fractional pixels.
    #[inline]
    pub fn subpixel_to_complex(&self, px: f64, py: f64) -> Complex {
        let range_re = self.range_re();
        let range_im = self.range_im();
        let left = self.center.re - range_re / 2.0;
        let top = self.center.im + range_im / 2.0;
        Complex::new(
            left + range_re * px / self.width as f64,
            top - range_im * py / self.height as f64,
        )
    }

    /// Inverse of [`subpixel_to_complex`](Self::subpixel_to_complex).
    pub fn complex_to_pixel(&self, point: Complex) -> (f64, f64) {
        let range_re = self.range_re();
        let range_im = self.range_im();
        let left = self.center.re - range_re / 2.0;
        let top = self.center.im + range_im / 2.0;
        (
            (point.re - left) * self.width as f64 / range_re,
            (top - point.im) * self.height as f64 / range_im,
        )
    }

    /// Move the center by `(dx, dy)` plane units at zoom 1.
    ///
    /// Distances are divided by the zoom, so the same pan covers the same
    /// fraction of the screen at every scale.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.center = Complex::new(
            self.center.re + dx / self.zoom,
            self.center.im + dy / self.zoom,
        );
    }

    /// Recenter on pixel `(px, py)` and multiply the zoom by `factor`.
    ///
    /// `factor > 1` zooms in. The recenter always happens. The new zoom goes
    /// through [`set_zoom`](Self::set_zoom), so a factor that would leave it
    /// non-positive or non-finite is reported and the previous zoom is kept.
    /// Undoing with `1 / factor` restores the zoom, but the center stays on
    /// the picked point unless that point was already the center.
    pub fn zoom_to_point(&mut self, px: u32, py: u32, factor: f64) -> crate::Result<()> {
        self.center = self.pixel_to_complex(px, py);
        self.set_zoom(self.zoom * factor)
    }

    /// Back to the origin at zoom 1; pixel dimensions are kept.
    pub fn reset(&mut self) {
        self.center = Complex::ZERO;
        self.zoom = Self::DEFAULT_ZOOM;
    }

    /// Whether center and zoom both lie within `tolerance` of `other`.
    pub fn is_similar(&self, other: &Viewport, tolerance: f64) -> bool {
        (self.center.re - other.center.re).abs() < tolerance
            && (self.center.im - other.center.im).abs() < tolerance
            && (self.zoom - other.zoom).abs() < tolerance
    }

    /// Canonical `centerX,centerY,zoom,width,height` form.
    pub fn to_canonical(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.center.re, self.center.im, self.zoom, self.width, self.height
        )
    }

    /// Parse the canonical form, falling back to [`Viewport::default`] on any
    /// malformed input.
    pub fn from_canonical(s: &str) -> Self {
        s.parse().unwrap_or_else(|e: CoreError| {
            warn!("{e}; using default viewport");
            Self::default()
        })
    }
}

impl FromStr for Viewport {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 5 {
            return Err(CoreError::MalformedViewport {
                reason: format!("expected 5 fields, got {}", parts.len()),
            });
        }
        let float = |i: usize| {
            parts[i].parse::<f64>().map_err(|e| CoreError::MalformedViewport {
                reason: format!("field {i} ({:?}): {e}", parts[i]),
            })
        };
        let int = |i: usize| {
            parts[i].parse::<u32>().map_err(|e| CoreError::MalformedViewport {
                reason: format!("field {i} ({:?}): {e}", parts[i]),
            })
        };
        let center = Complex::new(float(0)?, float(1)?);
        if !center.is_finite() {
            return Err(CoreError::MalformedViewport {
                reason: "center must be finite".into(),
            });
        }
        Self::new(center, float(2)?, int(3)?, int(4)?)
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "center ({:.4}, {:.4}), zoom {:.2}, {}x{}",
            self.center.re, self.center.im, self.zoom, self.width, self.height
        )
    }
}

fn check_zoom(zoom: f64) -> crate::Result<()> {
    if zoom > 0.0 && zoom.is_finite() {
        Ok(())
    } else {
        Err(CoreError::InvalidZoom(zoom))
    }
}

fn check_dimensions(width: u32, height: u32) -> crate::Result<()> {
    if width == 0 || height == 0 {
        return Err(CoreError::InvalidDimensions { width, height });
    }
    Ok(())
}

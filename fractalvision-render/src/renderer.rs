use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fractalvision_core::{EscapeTimeEngine, Viewport};

use crate::buffer::RenderBuffer;
use crate::palette::{ColorScheme, Palette};

// ---------------------------------------------------------------------------
// Quality
// ---------------------------------------------------------------------------

/// Resolution of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderQuality {
    /// Reduced raster (at most 400×300), capped iterations, linear coloring.
    Preview,
    /// Full viewport resolution with the configured iteration budget.
    #[default]
    Standard,
}

impl RenderQuality {
    pub const PREVIEW_MAX_WIDTH: u32 = 400;
    pub const PREVIEW_MAX_HEIGHT: u32 = 300;

    /// Raster size used for a viewport of `width × height` pixels.
    pub fn output_size(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Self::Preview => (
                width.min(Self::PREVIEW_MAX_WIDTH),
                height.min(Self::PREVIEW_MAX_HEIGHT),
            ),
            Self::Standard => (width, height),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Standard => "standard",
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// A finished, colored frame together with the settings that produced it.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub buffer: RenderBuffer,
    /// Viewport snapshot taken when the pass started.
    pub viewport: Viewport,
    pub engine: EscapeTimeEngine,
    pub scheme: ColorScheme,
    pub color_count: usize,
    pub quality: RenderQuality,
    /// Iteration budget actually used; lower than the engine's for previews.
    pub max_iterations: u32,
    pub interior_pixels: usize,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Full-frame render
// ---------------------------------------------------------------------------

/// Iterate and color every pixel of one frame.
///
/// Rows are handed to the Rayon pool as disjoint slices of a pre-sized
/// buffer; the calling thread blocks until every row is done.
///
/// A [`Preview`](RenderQuality::Preview) pass samples the full viewport at
/// `(x·W/w, y·H/h)` and iterates at most
/// [`DEFAULT_FAST_ITERATIONS`](EscapeTimeEngine::DEFAULT_FAST_ITERATIONS) times.
pub fn render(
    viewport: &Viewport,
    engine: &EscapeTimeEngine,
    palette: &Palette,
    quality: RenderQuality,
) -> RenderResult {
    let start = Instant::now();
    let (full_w, full_h) = (viewport.width(), viewport.height());
    let (width, height) = quality.output_size(full_w, full_h);
    let max_iterations = match quality {
        RenderQuality::Preview => engine
            .max_iterations()
            .min(EscapeTimeEngine::DEFAULT_FAST_ITERATIONS),
        RenderQuality::Standard => engine.max_iterations(),
    };
    debug!(
        width,
        height,
        max_iterations,
        quality = quality.label(),
        kind = %engine.kind(),
        "Starting row-parallel render"
    );

    let mut buffer = RenderBuffer::new(width, height);
    let stride = buffer.stride();

    let interior_pixels: usize = buffer
        .pixels
        .par_chunks_mut(stride)
        .enumerate()
        .map(|(y, row)| {
            let sy = scale(y as u32, full_h, height);
            let mut interior = 0;
            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let sx = scale(x as u32, full_w, width);
                let point = viewport.pixel_to_complex(sx, sy);
                let color = match quality {
                    RenderQuality::Preview => {
                        let result = engine.fast_iteration_count(point, max_iterations);
                        interior += usize::from(result.is_interior());
                        palette.fast_color(result, max_iterations)
                    }
                    RenderQuality::Standard => {
                        let result = engine.iteration_count(point);
                        interior += usize::from(result.is_interior());
                        palette.color(result, max_iterations)
                    }
                };
                pixel.copy_from_slice(&color);
            }
            interior
        })
        .sum();

    let elapsed = start.elapsed();
    info!(
        elapsed_ms = elapsed.as_millis(),
        width,
        height,
        interior_pixels,
        quality = quality.label(),
        "Render complete"
    );

    RenderResult {
        buffer,
        viewport: viewport.clone(),
        engine: engine.clone(),
        scheme: palette.scheme(),
        color_count: palette.color_count(),
        quality,
        max_iterations,
        interior_pixels,
        elapsed,
    }
}

/// Map raster coordinate `i` of an `out`-wide axis onto a `full`-wide one.
#[inline]
fn scale(i: u32, full: u32, out: u32) -> u32 {
    if full == out {
        i
    } else {
        (i as u64 * full as u64 / out as u64) as u32
    }
}

use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use fractalvision_core::{Complex, FractalKind, Viewport};
use fractalvision_render::{ColorScheme, RenderQuality, RenderSettings};

use crate::preferences::Preferences;

/// One `--zoom-at` step: recenter on a pixel and scale the zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomStep {
    pub px: u32,
    pub py: u32,
    pub factor: f64,
}

#[derive(Parser, Debug)]
#[command(
    name = "fractalvision",
    about = "Render Mandelbrot and Julia sets to PNG or JPEG",
    version
)]
pub struct Cli {
    /// Fractal to render: mandelbrot or julia
    #[arg(long)]
    pub kind: Option<FractalKind>,

    /// Output width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    #[arg(long, allow_hyphen_values = true)]
    pub center_x: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub center_y: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub zoom: Option<f64>,

    /// Start from a saved view: "centerX,centerY,zoom,width,height"
    #[arg(long, allow_hyphen_values = true)]
    pub view: Option<String>,

    /// Start from the last exported view stored in the preferences
    #[arg(long)]
    pub restore: bool,

    /// Iteration budget (1 to 10000)
    #[arg(long)]
    pub iterations: Option<u32>,

    #[arg(long)]
    pub escape_radius: Option<f64>,

    /// Real part of the Julia constant
    #[arg(long, allow_hyphen_values = true)]
    pub julia_re: Option<f64>,

    /// Imaginary part of the Julia constant
    #[arg(long, allow_hyphen_values = true)]
    pub julia_im: Option<f64>,

    /// Color scheme: rainbow, fire, ocean, forest or grayscale
    #[arg(long)]
    pub palette: Option<ColorScheme>,

    /// Number of palette entries (1 to 4096)
    #[arg(long)]
    pub colors: Option<usize>,

    /// Two-color gradient instead of a named scheme, as RRGGBB hex
    #[arg(long, num_args = 2, value_names = ["START", "END"], value_parser = parse_hex_color)]
    pub gradient: Option<Vec<[u8; 3]>>,

    /// Render a low-resolution preview pass before the final frame
    #[arg(long)]
    pub preview: bool,

    /// Zoom step "PX,PY,FACTOR" applied before the final render (repeatable)
    #[arg(long = "zoom-at", value_parser = parse_zoom_step)]
    pub zoom_at: Vec<ZoomStep>,

    /// Step back through this many zoom steps afterwards
    #[arg(long, default_value_t = 0)]
    pub undo: usize,

    /// Output file (.png, .jpg or .jpeg). Defaults to a generated PNG name
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rescale the exported image to "WIDTHxHEIGHT"
    #[arg(long, value_parser = parse_size)]
    pub export_size: Option<(u32, u32)>,

    /// JPEG quality (clamped to 10..=100)
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// Ignore the stored preferences
    #[arg(long)]
    pub no_prefs: bool,

    /// Store the resulting settings as the new preferences
    #[arg(long)]
    pub save_prefs: bool,
}

impl Cli {
    /// Starting viewport: explicit `--view`, then the stored last view when
    /// `--restore` is given, then the preferred size; flags override on top.
    pub fn viewport(&self, prefs: &Preferences) -> Viewport {
        let mut viewport = match (&self.view, self.restore, &prefs.last_view) {
            (Some(view), _, _) => Viewport::from_canonical(view),
            (None, true, Some(last)) => Viewport::from_canonical(last),
            _ => Viewport::with_size(prefs.width, prefs.height).unwrap_or_else(|e| {
                warn!("{e}; using default size");
                Viewport::default()
            }),
        };

        if self.center_x.is_some() || self.center_y.is_some() {
            let c = viewport.center();
            viewport.set_center(Complex::new(
                self.center_x.unwrap_or(c.re),
                self.center_y.unwrap_or(c.im),
            ));
        }
        if let Some(zoom) = self.zoom {
            if let Err(e) = viewport.set_zoom(zoom) {
                warn!(kept = viewport.zoom(), "{e}");
            }
        }
        if self.width.is_some() || self.height.is_some() {
            let w = self.width.unwrap_or(viewport.width());
            let h = self.height.unwrap_or(viewport.height());
            if let Err(e) = viewport.resize(w, h) {
                warn!("{e}; keeping {}x{}", viewport.width(), viewport.height());
            }
        }
        viewport
    }

    /// Stored settings with every given flag applied. Rejected values are
    /// logged and the stored value is kept.
    pub fn settings(&self, prefs: &Preferences) -> RenderSettings {
        let mut settings = prefs.render.clone();
        let engine = &mut settings.engine;

        if let Some(kind) = self.kind {
            engine.set_kind(kind);
        }
        if let Some(n) = self.iterations {
            let _ = engine.set_max_iterations(n);
        }
        if let Some(r) = self.escape_radius {
            let _ = engine.set_escape_radius(r);
        }
        if self.julia_re.is_some() || self.julia_im.is_some() {
            let c = engine.julia_constant();
            engine.set_julia_constant(Complex::new(
                self.julia_re.unwrap_or(c.re),
                self.julia_im.unwrap_or(c.im),
            ));
        }

        let palette = &mut settings.palette;
        if let Some([start, end]) = self.gradient.as_deref() {
            palette.set_scheme(ColorScheme::Custom {
                start: *start,
                end: *end,
            });
        } else if let Some(scheme) = self.palette {
            palette.set_scheme(scheme);
        }
        if let Some(n) = self.colors {
            let _ = palette.set_color_count(n);
        }

        settings.quality = RenderQuality::Standard;
        settings
    }
}

pub fn parse_hex_color(s: &str) -> Result<[u8; 3], String> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(format!("expected RRGGBB, got '{s}'"));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("'{s}': {e}"))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

pub fn parse_zoom_step(s: &str) -> Result<ZoomStep, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [px, py, factor] = parts.as_slice() else {
        return Err(format!("expected PX,PY,FACTOR, got '{s}'"));
    };
    Ok(ZoomStep {
        px: px.parse().map_err(|e| format!("pixel x '{px}': {e}"))?,
        py: py.parse().map_err(|e| format!("pixel y '{py}': {e}"))?,
        factor: factor.parse().map_err(|e| format!("factor '{factor}': {e}"))?,
    })
}

pub fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("width '{w}': {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("height '{h}': {e}"))?;
    if w == 0 || h == 0 {
        return Err(format!("size must be non-zero, got '{s}'"));
    }
    Ok((w, h))
}

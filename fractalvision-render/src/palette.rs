use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use fractalvision_core::IterationResult;

use crate::error::RenderError;

/// RGBA color, alpha always opaque.
pub type Rgba = [u8; 4];

/// Color of points that never escaped.
pub const INTERIOR_COLOR: Rgba = [0, 0, 0, 255];

// ---------------------------------------------------------------------------
// Schemes
// ---------------------------------------------------------------------------

/// Rule used to generate a palette's color ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum ColorScheme {
    /// Hue 0° → 240° at full saturation and value.
    #[default]
    Rainbow,
    /// Black → red → yellow → white in equal thirds.
    Fire,
    /// Deep teal → light cyan.
    Ocean,
    /// Dark green → pale green.
    Forest,
    /// Black → white.
    Grayscale,
    /// Straight blend between two endpoint colors.
    Custom { start: [u8; 3], end: [u8; 3] },
}

impl ColorScheme {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rainbow => "Rainbow",
            Self::Fire => "Fire",
            Self::Ocean => "Ocean",
            Self::Forest => "Forest",
            Self::Grayscale => "Grayscale",
            Self::Custom { .. } => "Custom",
        }
    }

    /// Fill `count` entries according to this scheme.
    fn generate(&self, count: usize) -> Vec<Rgba> {
        (0..count)
            .map(|i| {
                let t = ramp_position(i, count);
                match *self {
                    Self::Rainbow => hsv_to_rgb(240.0 * t, 1.0, 1.0),
                    Self::Fire => fire(t),
                    Self::Ocean => rgb(50.0 * (1.0 - t), 100.0 + 155.0 * t, 200.0 + 55.0 * t),
                    Self::Forest => rgb(50.0 * t, 100.0 + 155.0 * t, 50.0 * t),
                    Self::Grayscale => {
                        let v = 255.0 * t;
                        rgb(v, v, v)
                    }
                    Self::Custom { start, end } => rgb(
                        lerp(start[0], end[0], t),
                        lerp(start[1], end[1], t),
                        lerp(start[2], end[2], t),
                    ),
                }
            })
            .collect()
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parses the names of the built-in schemes (case-insensitive).
impl FromStr for ColorScheme {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        builtin_schemes()
            .into_iter()
            .find(|scheme| scheme.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| RenderError::UnknownScheme(s.to_string()))
    }
}

/// Every scheme that needs no extra parameters.
pub fn builtin_schemes() -> [ColorScheme; 5] {
    [
        ColorScheme::Rainbow,
        ColorScheme::Fire,
        ColorScheme::Ocean,
        ColorScheme::Forest,
        ColorScheme::Grayscale,
    ]
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// A fixed-length color ramp plus the mapping from iteration counts to it.
///
/// The ramp is regenerated in full whenever the scheme or the length changes.
/// Serialized as its scheme and length only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "PaletteConfig", try_from = "PaletteConfig")]
pub struct Palette {
    scheme: ColorScheme,
    colors: Vec<Rgba>,
}

#[derive(Serialize, Deserialize)]
struct PaletteConfig {
    #[serde(flatten)]
    scheme: ColorScheme,
    #[serde(default = "default_color_count")]
    color_count: usize,
}

fn default_color_count() -> usize {
    Palette::DEFAULT_COLOR_COUNT
}

impl From<Palette> for PaletteConfig {
    fn from(p: Palette) -> Self {
        Self {
            scheme: p.scheme,
            color_count: p.colors.len(),
        }
    }
}

impl TryFrom<PaletteConfig> for Palette {
    type Error = RenderError;

    fn try_from(config: PaletteConfig) -> Result<Self, Self::Error> {
        Palette::new(config.scheme, config.color_count)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_scheme(ColorScheme::default())
    }
}

impl Palette {
    pub const DEFAULT_COLOR_COUNT: usize = 256;
    pub const MAX_COLOR_COUNT: usize = 4096;

    pub fn new(scheme: ColorScheme, color_count: usize) -> crate::Result<Self> {
        check_color_count(color_count)?;
        Ok(Self {
            scheme,
            colors: scheme.generate(color_count),
        })
    }

    /// `scheme` with the default number of colors.
    pub fn from_scheme(scheme: ColorScheme) -> Self {
        Self {
            scheme,
            colors: scheme.generate(Self::DEFAULT_COLOR_COUNT),
        }
    }

    /// Two-color gradient from `start` to `end`.
    pub fn custom(start: [u8; 3], end: [u8; 3], color_count: usize) -> crate::Result<Self> {
        Self::new(ColorScheme::Custom { start, end }, color_count)
    }

    pub fn scheme(&self) -> ColorScheme {
        self.scheme
    }

    pub fn color_count(&self) -> usize {
        self.colors.len()
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    pub fn set_scheme(&mut self, scheme: ColorScheme) {
        self.scheme = scheme;
        self.colors = scheme.generate(self.colors.len());
    }

    /// Rejected counts are logged and the current ramp is kept.
    pub fn set_color_count(&mut self, color_count: usize) -> crate::Result<()> {
        check_color_count(color_count).inspect_err(|e| {
            warn!(kept = self.colors.len(), "{e}");
        })?;
        self.colors = self.scheme.generate(color_count);
        Ok(())
    }

    /// Smoothed lookup: `1 − √(1 − ratio)` stretches the low counts, where
    /// most of the structure near the set boundary lives.
    pub fn color(&self, result: IterationResult, max_iterations: u32) -> Rgba {
        let Some(n) = result.escape_count() else {
            return INTERIOR_COLOR;
        };
        let ratio = (n as f64 / max_iterations.max(1) as f64).clamp(0.0, 1.0);
        let smooth = 1.0 - (1.0 - ratio).sqrt();
        let last = self.colors.len() - 1;
        let index = (smooth * last as f64).round() as usize;
        self.colors[index.min(last)]
    }

    /// Linear lookup without smoothing, for preview passes.
    pub fn fast_color(&self, result: IterationResult, max_iterations: u32) -> Rgba {
        let Some(n) = result.escape_count() else {
            return INTERIOR_COLOR;
        };
        let len = self.colors.len() as u64;
        let index = n as u64 * len / max_iterations.max(1) as u64;
        self.colors[index.min(len - 1) as usize]
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} colors", self.scheme, self.colors.len())
    }
}

fn check_color_count(count: usize) -> crate::Result<()> {
    if (1..=Palette::MAX_COLOR_COUNT).contains(&count) {
        Ok(())
    } else {
        Err(RenderError::InvalidColorCount(count))
    }
}

// ---------------------------------------------------------------------------
// Color math
// ---------------------------------------------------------------------------

/// Position of entry `i` along a ramp of `count` entries, in `[0, 1]`.
fn ramp_position(i: usize, count: usize) -> f64 {
    if count <= 1 {
        0.0
    } else {
        i as f64 / (count - 1) as f64
    }
}

fn rgb(r: f64, g: f64, b: f64) -> Rgba {
    [channel(r), channel(g), channel(b), 255]
}

/// Truncate to a byte.
fn channel(v: f64) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

fn lerp(a: u8, b: u8, t: f64) -> f64 {
    a as f64 + (b as f64 - a as f64) * t
}

fn fire(t: f64) -> Rgba {
    const THIRD: f64 = 1.0 / 3.0;
    if t < THIRD {
        rgb(255.0 * t / THIRD, 0.0, 0.0)
    } else if t < 2.0 * THIRD {
        rgb(255.0, 255.0 * (t - THIRD) / THIRD, 0.0)
    } else {
        rgb(255.0, 255.0, 255.0 * (t - 2.0 * THIRD) / THIRD)
    }
}

/// Six-sector HSV → RGB. `h` in degrees, `s` and `v` in `[0, 1]`.
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgba {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    rgb((r + m) * 255.0, (g + m) * 255.0, (b + m) * 255.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(iterations: u32) -> IterationResult {
        IterationResult::Escaped { iterations }
    }

    fn all_schemes() -> Vec<ColorScheme> {
        let mut schemes = builtin_schemes().to_vec();
        schemes.push(ColorScheme::Custom {
            start: [0, 0, 255],
            end: [255, 255, 255],
        });
        schemes
    }

    #[test]
    fn interior_is_black_for_every_scheme() {
        for scheme in all_schemes() {
            for count in [1, 2, 256, 4096] {
                let p = Palette::new(scheme, count).unwrap();
                for max in [1, 100, 10_000] {
                    assert_eq!(p.color(IterationResult::Interior, max), INTERIOR_COLOR);
                    assert_eq!(p.fast_color(IterationResult::Interior, max), INTERIOR_COLOR);
                }
            }
        }
    }

    #[test]
    fn palettes_have_exact_length() {
        for scheme in all_schemes() {
            for count in [1, 2, 3, 128, 256, 4096] {
                let p = Palette::new(scheme, count).unwrap();
                assert_eq!(p.colors().len(), count, "{scheme} × {count}");
                assert_eq!(p.color_count(), count);
            }
        }
    }

    #[test]
    fn lookups_stay_in_bounds() {
        for count in [1, 7, 256] {
            let p = Palette::new(ColorScheme::Fire, count).unwrap();
            for max in [1, 3, 100] {
                for n in 0..=max {
                    let _ = p.color(escaped(n), max);
                    let _ = p.fast_color(escaped(n), max);
                }
                // Counts past the budget clamp rather than panic.
                let _ = p.color(escaped(max * 10), max);
                let _ = p.fast_color(escaped(max * 10), max);
            }
        }
    }

    #[test]
    fn smooth_mapping_uses_square_root_and_rounding() {
        let p = Palette::new(ColorScheme::Grayscale, 256).unwrap();
        // ratio 0.75 → smooth 0.5 → index round(127.5) = 128.
        assert_eq!(p.color(escaped(75), 100), p.colors()[128]);
        assert_eq!(p.color(escaped(0), 100), p.colors()[0]);
        assert_eq!(p.color(escaped(100), 100), p.colors()[255]);
    }

    #[test]
    fn fast_mapping_is_linear() {
        let p = Palette::new(ColorScheme::Grayscale, 256).unwrap();
        assert_eq!(p.fast_color(escaped(50), 100), p.colors()[128]);
        assert_eq!(p.fast_color(escaped(100), 100), p.colors()[255]);
        assert_eq!(p.fast_color(escaped(1), 100), p.colors()[2]);
    }

    #[test]
    fn rainbow_runs_red_to_blue() {
        let p = Palette::from_scheme(ColorScheme::Rainbow);
        assert_eq!(p.colors()[0], [255, 0, 0, 255]);
        assert_eq!(p.colors()[255], [0, 0, 255, 255]);
        // Never wraps back to red.
        assert!(p.colors()[255][0] == 0);
    }

    #[test]
    fn fire_passes_through_red_and_yellow() {
        let p = Palette::new(ColorScheme::Fire, 7).unwrap();
        assert_eq!(p.colors()[0], [0, 0, 0, 255]);
        assert_eq!(p.colors()[6], [255, 255, 255, 255]);
        // Entry 2 of 7 sits at 1/3: fully red.
        assert_eq!(p.colors()[2][0], 255);
        assert_eq!(p.colors()[2][2], 0);
        // Entry 4 of 7 sits at 2/3: yellow.
        assert_eq!(&p.colors()[4][..3], &[255, 255, 0]);
    }

    #[test]
    fn linear_scheme_endpoints() {
        let ocean = Palette::new(ColorScheme::Ocean, 256).unwrap();
        assert_eq!(ocean.colors()[0], [50, 100, 200, 255]);
        assert_eq!(ocean.colors()[255], [0, 255, 255, 255]);

        let forest = Palette::new(ColorScheme::Forest, 256).unwrap();
        assert_eq!(forest.colors()[0], [0, 100, 0, 255]);
        assert_eq!(forest.colors()[255], [50, 255, 50, 255]);

        let gray = Palette::new(ColorScheme::Grayscale, 256).unwrap();
        assert_eq!(gray.colors()[0], [0, 0, 0, 255]);
        assert_eq!(gray.colors()[255], [255, 255, 255, 255]);
    }

    #[test]
    fn custom_gradient_interpolates() {
        let p = Palette::custom([0, 0, 255], [255, 255, 255], 3).unwrap();
        assert_eq!(p.colors()[0], [0, 0, 255, 255]);
        assert_eq!(p.colors()[1], [127, 127, 255, 255]);
        assert_eq!(p.colors()[2], [255, 255, 255, 255]);
        assert_eq!(p.scheme().label(), "Custom");
    }

    #[test]
    fn single_color_palette() {
        let p = Palette::new(ColorScheme::Rainbow, 1).unwrap();
        assert_eq!(p.colors(), &[[255, 0, 0, 255]]);
        assert_eq!(p.color(escaped(40), 100), [255, 0, 0, 255]);
    }

    #[test]
    fn invalid_count_is_rejected_and_ramp_kept() {
        assert!(Palette::new(ColorScheme::Fire, 0).is_err());
        assert!(Palette::new(ColorScheme::Fire, 4097).is_err());

        let mut p = Palette::new(ColorScheme::Ocean, 64).unwrap();
        let before = p.clone();
        assert!(p.set_color_count(0).is_err());
        assert!(p.set_color_count(5000).is_err());
        assert_eq!(p, before);
    }

    #[test]
    fn changes_regenerate_whole_ramp() {
        let mut p = Palette::from_scheme(ColorScheme::Rainbow);
        p.set_color_count(128).unwrap();
        assert_eq!(p, Palette::new(ColorScheme::Rainbow, 128).unwrap());
        p.set_scheme(ColorScheme::Grayscale);
        assert_eq!(p, Palette::new(ColorScheme::Grayscale, 128).unwrap());
    }

    #[test]
    fn scheme_names_parse() {
        assert_eq!("fire".parse::<ColorScheme>().unwrap(), ColorScheme::Fire);
        assert_eq!("GRAYSCALE".parse::<ColorScheme>().unwrap(), ColorScheme::Grayscale);
        assert!("plasma".parse::<ColorScheme>().is_err());
    }

    #[test]
    fn serializes_as_scheme_and_count() {
        let p = Palette::custom([1, 2, 3], [4, 5, 6], 32).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let back: Palette = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);

        let fire: Palette = serde_json::from_str(r#"{"scheme":"fire"}"#).unwrap();
        assert_eq!(fire, Palette::from_scheme(ColorScheme::Fire));
        assert!(serde_json::from_str::<Palette>(r#"{"scheme":"fire","color_count":0}"#).is_err());
    }

    #[test]
    fn info_string() {
        let p = Palette::new(ColorScheme::Ocean, 128).unwrap();
        assert_eq!(p.to_string(), "Ocean, 128 colors");
    }
}

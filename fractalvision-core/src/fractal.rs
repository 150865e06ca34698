use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::error::CoreError;

/// Outcome of iterating a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IterationResult {
    /// `|z|` exceeded the escape radius on step `iterations` (0-based).
    Escaped { iterations: u32 },

    /// The iteration budget ran out without escaping; the point is treated
    /// as a member of the set.
    Interior,
}

impl IterationResult {
    /// Escape count, or `None` for interior points.
    #[inline]
    pub fn escape_count(self) -> Option<u32> {
        match self {
            Self::Escaped { iterations } => Some(iterations),
            Self::Interior => None,
        }
    }

    /// Integer form where interior points are `-1`.
    #[inline]
    pub fn as_signed(self) -> i64 {
        self.escape_count().map_or(-1, i64::from)
    }

    #[inline]
    pub fn is_interior(self) -> bool {
        matches!(self, Self::Interior)
    }
}

/// Which recurrence the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalKind {
    /// `z₀ = 0`, `c` is the pixel's point.
    #[default]
    Mandelbrot,
    /// `z₀` is the pixel's point, `c` is a fixed constant.
    Julia,
}

impl FractalKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Mandelbrot => "Mandelbrot",
            Self::Julia => "Julia",
        }
    }
}

impl fmt::Display for FractalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FractalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mandelbrot" => Ok(Self::Mandelbrot),
            "julia" => Ok(Self::Julia),
            other => Err(format!("unknown fractal kind '{other}'")),
        }
    }
}

/// Iteration limits shared by every recurrence.
///
/// The cached `escape_radius_sq` is recomputed on deserialization so that
/// stored configurations always stay consistent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FractalParams {
    max_iterations: u32,
    escape_radius: f64,
    #[serde(skip)]
    escape_radius_sq: f64,
}

impl<'de> Deserialize<'de> for FractalParams {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            max_iterations: u32,
            escape_radius: f64,
        }
        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.max_iterations, raw.escape_radius).map_err(serde::de::Error::custom)
    }
}

impl FractalParams {
    pub const DEFAULT_MAX_ITERATIONS: u32 = 100;
    pub const MAX_ITERATIONS_LIMIT: u32 = 10_000;
    pub const DEFAULT_ESCAPE_RADIUS: f64 = 2.0;

    pub fn new(max_iterations: u32, escape_radius: f64) -> crate::Result<Self> {
        check_max_iterations(max_iterations)?;
        check_escape_radius(escape_radius)?;
        Ok(Self {
            max_iterations,
            escape_radius,
            escape_radius_sq: escape_radius * escape_radius,
        })
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn escape_radius(&self) -> f64 {
        self.escape_radius
    }

    /// Pre-computed squared escape radius for the inner loop.
    #[inline]
    pub fn escape_radius_sq(&self) -> f64 {
        self.escape_radius_sq
    }

    pub fn set_max_iterations(&mut self, max_iterations: u32) -> crate::Result<()> {
        check_max_iterations(max_iterations)?;
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn set_escape_radius(&mut self, r: f64) -> crate::Result<()> {
        check_escape_radius(r)?;
        self.escape_radius = r;
        self.escape_radius_sq = r * r;
        Ok(())
    }
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            escape_radius: Self::DEFAULT_ESCAPE_RADIUS,
            escape_radius_sq: Self::DEFAULT_ESCAPE_RADIUS * Self::DEFAULT_ESCAPE_RADIUS,
        }
    }
}

fn check_max_iterations(n: u32) -> crate::Result<()> {
    if (1..=FractalParams::MAX_ITERATIONS_LIMIT).contains(&n) {
        Ok(())
    } else {
        Err(CoreError::InvalidMaxIterations(n))
    }
}

fn check_escape_radius(r: f64) -> crate::Result<()> {
    if r > 0.0 && r.is_finite() {
        Ok(())
    } else {
        Err(CoreError::InvalidEscapeRadius(r))
    }
}

/// A quadratic escape-time recurrence.
///
/// Implementors are stateless apart from their defining constants, so one
/// instance can be shared by every worker of a render. The iteration cap is
/// an argument rather than a field: a preview pass and a full pass may run
/// against the same fractal with different budgets.
pub trait Fractal {
    /// Iterate `point` for at most `max_iterations` steps, escaping as soon as
    /// `|z|² > escape_radius_sq`.
    fn iterate(&self, point: Complex, max_iterations: u32, escape_radius_sq: f64)
        -> IterationResult;
}

/// Shared inner loop: `z ← z² + c` until escape or `max_iterations` steps.
#[inline]
pub(crate) fn escape_time(
    mut z: Complex,
    c: Complex,
    max_iterations: u32,
    escape_radius_sq: f64,
) -> IterationResult {
    for n in 0..max_iterations {
        z = z.square() + c;
        if z.norm_sq() > escape_radius_sq {
            return IterationResult::Escaped { iterations: n };
        }
    }
    IterationResult::Interior
}

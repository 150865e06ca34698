use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::complex::Complex;
use crate::fractal::{Fractal, FractalKind, FractalParams, IterationResult};
use crate::julia::Julia;
use crate::mandelbrot::Mandelbrot;

/// Escape-time calculator configuration: iteration limits, recurrence kind
/// and the Julia constant.
///
/// The engine is a plain value. All queries take `&self` and the fast
/// preview path receives its iteration cap as an argument, so one engine can
/// serve any number of concurrent renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscapeTimeEngine {
    params: FractalParams,
    kind: FractalKind,
    julia_c: Complex,
}

impl Default for EscapeTimeEngine {
    fn default() -> Self {
        Self {
            params: FractalParams::default(),
            kind: FractalKind::default(),
            julia_c: Julia::DEFAULT_C,
        }
    }
}

impl EscapeTimeEngine {
    /// Iteration cap used by [`fast_iteration_count`](Self::fast_iteration_count)
    /// when the caller has no better budget.
    pub const DEFAULT_FAST_ITERATIONS: u32 = 50;

    pub fn new(kind: FractalKind, params: FractalParams) -> Self {
        Self {
            params,
            kind,
            ..Self::default()
        }
    }

    pub fn julia(c: Complex, params: FractalParams) -> Self {
        Self {
            params,
            kind: FractalKind::Julia,
            julia_c: c,
        }
    }

    pub fn params(&self) -> &FractalParams {
        &self.params
    }

    pub fn kind(&self) -> FractalKind {
        self.kind
    }

    pub fn julia_constant(&self) -> Complex {
        self.julia_c
    }

    pub fn max_iterations(&self) -> u32 {
        self.params.max_iterations()
    }

    pub fn escape_radius(&self) -> f64 {
        self.params.escape_radius()
    }

    /// Rejected values are logged and the previous value is kept.
    pub fn set_max_iterations(&mut self, max_iterations: u32) -> crate::Result<()> {
        self.params.set_max_iterations(max_iterations).inspect_err(|e| {
            warn!(kept = self.params.max_iterations(), "{e}");
        })
    }

    /// Rejected values are logged and the previous value is kept.
    pub fn set_escape_radius(&mut self, radius: f64) -> crate::Result<()> {
        self.params.set_escape_radius(radius).inspect_err(|e| {
            warn!(kept = self.params.escape_radius(), "{e}");
        })
    }

    pub fn set_kind(&mut self, kind: FractalKind) {
        self.kind = kind;
    }

    /// Only consulted when the kind is [`FractalKind::Julia`].
    pub fn set_julia_constant(&mut self, c: Complex) {
        self.julia_c = c;
    }

    /// Iterate `point` with the configured budget.
    #[inline]
    pub fn iteration_count(&self, point: Complex) -> IterationResult {
        self.iteration_count_with_cap(point, self.params.max_iterations())
    }

    /// Iterate `point` with an explicit budget instead of the configured one.
    #[inline]
    pub fn iteration_count_with_cap(&self, point: Complex, max_iterations: u32) -> IterationResult {
        let radius_sq = self.params.escape_radius_sq();
        match self.kind {
            FractalKind::Mandelbrot => Mandelbrot.iterate(point, max_iterations, radius_sq),
            FractalKind::Julia => Julia::new(self.julia_c).iterate(point, max_iterations, radius_sq),
        }
    }

    /// Cheap preview iteration bounded by `cap`.
    ///
    /// Nothing about the engine changes, so a later
    /// [`iteration_count`](Self::iteration_count) sees the full budget.
    #[inline]
    pub fn fast_iteration_count(&self, point: Complex, cap: u32) -> IterationResult {
        self.iteration_count_with_cap(point, cap)
    }

    pub fn is_in_set(&self, point: Complex) -> bool {
        self.iteration_count(point).is_interior()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn mandelbrot_origin_is_in_set() {
        let engine = EscapeTimeEngine::default();
        assert_eq!(engine.max_iterations(), 100);
        assert_eq!(engine.iteration_count(Complex::ZERO), IterationResult::Interior);
        assert!(engine.is_in_set(Complex::ZERO));
    }

    #[test]
    fn mandelbrot_two_plus_two_i_escapes_within_five() {
        let engine = EscapeTimeEngine::default();
        let n = engine.iteration_count(Complex::new(2.0, 2.0)).as_signed();
        assert!((0..5).contains(&n), "escaped at {n}");
        assert!(!engine.is_in_set(Complex::new(2.0, 2.0)));
    }

    #[test]
    fn julia_uses_configured_constant() {
        let mut engine = EscapeTimeEngine::default();
        engine.set_kind(FractalKind::Julia);
        engine.set_julia_constant(Complex::ZERO);
        assert!(engine.is_in_set(Complex::new(0.5, 0.5)));
        // Same point as a Mandelbrot parameter escapes.
        engine.set_kind(FractalKind::Mandelbrot);
        assert!(!engine.is_in_set(Complex::new(0.5, 0.5)));
    }

    #[test]
    fn julia_default_constant() {
        let engine = EscapeTimeEngine::julia(Julia::DEFAULT_C, FractalParams::default());
        assert_eq!(engine.julia_constant(), Complex::new(-0.7, 0.27015));
        assert_eq!(engine.kind(), FractalKind::Julia);
    }

    #[test]
    fn rejected_setters_keep_previous_values() {
        let mut engine = EscapeTimeEngine::default();
        engine.set_max_iterations(2500).unwrap();
        assert!(engine.set_max_iterations(0).is_err());
        assert!(engine.set_max_iterations(20_000).is_err());
        assert_eq!(engine.max_iterations(), 2500);

        assert!(engine.set_escape_radius(-2.0).is_err());
        assert_eq!(engine.escape_radius(), 2.0);
    }

    #[test]
    fn fast_count_does_not_leak_cap() {
        let engine = EscapeTimeEngine::new(
            FractalKind::Mandelbrot,
            FractalParams::new(1000, 2.0).unwrap(),
        );
        // Just right of the cardioid cusp: the orbit creeps out over ~30 steps.
        let c = Complex::new(0.26, 0.0);
        let full = engine.iteration_count(c);
        let n = full.escape_count().expect("0.26 lies outside the set");
        assert!(n >= 10, "expected a slow escape, got {n}");
        assert_eq!(engine.fast_iteration_count(c, 10), IterationResult::Interior);
        assert_eq!(engine.iteration_count(c), full);
        assert_eq!(engine.max_iterations(), 1000);
    }

    #[test]
    fn concurrent_fast_and_full_counts_agree() {
        let engine = Arc::new(EscapeTimeEngine::new(
            FractalKind::Mandelbrot,
            FractalParams::new(400, 2.0).unwrap(),
        ));
        let points: Vec<Complex> = (0..64)
            .map(|i| Complex::new(-2.0 + i as f64 * 0.04, 0.3))
            .collect();
        let expected: Vec<_> = points.iter().map(|&p| engine.iteration_count(p)).collect();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let engine = Arc::clone(&engine);
                let points = points.clone();
                thread::spawn(move || {
                    points
                        .iter()
                        .map(|&p| {
                            if t % 2 == 0 {
                                let _ = engine.fast_iteration_count(p, 5);
                            }
                            engine.iteration_count(p)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    }

    #[test]
    fn serde_round_trip_with_defaults() {
        let engine: EscapeTimeEngine = serde_json::from_str(r#"{"kind":"julia"}"#).unwrap();
        assert_eq!(engine.kind(), FractalKind::Julia);
        assert_eq!(engine.max_iterations(), 100);
        assert_eq!(engine.julia_constant(), Julia::DEFAULT_C);

        let json = serde_json::to_string(&engine).unwrap();
        let back: EscapeTimeEngine = serde_json::from_str(&json).unwrap();
        assert_eq!(back, engine);
    }
}

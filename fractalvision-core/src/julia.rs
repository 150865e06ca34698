use crate::complex::Complex;
use crate::fractal::{escape_time, Fractal, IterationResult};

/// A Julia set: `z_{n+1} = z_n² + c`, where `c` is a fixed constant
/// and `z₀` is the point on the complex plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Julia {
    c: Complex,
}

impl Julia {
    /// A visually interesting default: `c = -0.7 + 0.27015i`.
    pub const DEFAULT_C: Complex = Complex::new(-0.7, 0.27015);

    pub fn new(c: Complex) -> Self {
        Self { c }
    }

    /// The constant `c` defining this Julia set.
    pub fn c(&self) -> Complex {
        self.c
    }
}

impl Default for Julia {
    fn default() -> Self {
        Self::new(Self::DEFAULT_C)
    }
}

impl Fractal for Julia {
    fn iterate(&self, point: Complex, max_iterations: u32, escape_radius_sq: f64) -> IterationResult {
        escape_time(point, self.c, max_iterations, escape_radius_sq)
    }
}

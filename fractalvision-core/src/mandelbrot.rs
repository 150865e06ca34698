use crate::complex::Complex;
use crate::fractal::{escape_time, Fractal, IterationResult};

/// The Mandelbrot set: `z_{n+1} = z_n² + c`, starting from `z₀ = 0`.
///
/// The point `c` is the coordinate on the complex plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mandelbrot;

/// Returns `true` if `c` lies inside the main cardioid.
#[inline]
fn in_cardioid(c: Complex) -> bool {
    let im2 = c.im * c.im;
    let q = (c.re - 0.25) * (c.re - 0.25) + im2;
    q * (q + (c.re - 0.25)) <= 0.25 * im2
}

/// Returns `true` if `c` lies inside the period-2 bulb.
#[inline]
fn in_period2_bulb(c: Complex) -> bool {
    (c.re + 1.0) * (c.re + 1.0) + c.im * c.im <= 0.0625
}

impl Fractal for Mandelbrot {
    fn iterate(&self, c: Complex, max_iterations: u32, escape_radius_sq: f64) -> IterationResult {
        // Orbits of set members never leave |z| <= 2, so the closed-form
        // membership tests are only exact for radii of at least 2.
        if escape_radius_sq >= 4.0 && (in_cardioid(c) || in_period2_bulb(c)) {
            return IterationResult::Interior;
        }
        escape_time(Complex::ZERO, c, max_iterations, escape_radius_sq)
    }
}

//! Epsilon-aware comparisons for floating-point arrival times.

use serde::{Deserialize, Serialize};

/// An absolute tolerance used when comparing L-values and periods.
///
/// Relaxation only counts an update as progress when it exceeds the
/// tolerance, which keeps floating-point noise from looking like an
/// unbounded positive cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerance(pub f64);

impl Tolerance {
    /// The default tolerance of `1e-6`.
    pub const DEFAULT: Tolerance = Tolerance(1e-6);

    /// Returns the raw epsilon.
    pub fn epsilon(self) -> f64 {
        self.0
    }

    /// Returns `true` if `a` exceeds `b` by more than the tolerance.
    pub fn gt(self, a: f64, b: f64) -> bool {
        a > b + self.0
    }

    /// Returns `true` if `a` is at least `b` within the tolerance.
    pub fn ge(self, a: f64, b: f64) -> bool {
        a >= b - self.0
    }

    /// Returns `true` if `a` and `b` differ by at most the tolerance.
    pub fn approx_eq(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.0
    }

    /// Ceiling that ignores overshoot below the tolerance, so `2.0000001`
    /// rounds to `2` instead of `3`.
    pub fn ceil(self, x: f64) -> f64 {
        (x - self.0).ceil()
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

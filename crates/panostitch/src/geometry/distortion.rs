//! Radial lens distortion polynomial and its iterative inverse.

use serde::{Deserialize, Serialize};

/// Radial distortion polynomial `r_src = r * (a r^3 + b r^2 + c r + d)`
/// with `d = 1 - a - b - c`, radii normalized by half the smaller image
/// dimension.
///
/// The forward direction maps an ideal (projection-model) radius to the
/// distorted radius actually recorded by the lens. The inverse has no closed
/// form and is solved by Newton iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RadialPolynomial {
    /// Cubic coefficient.
    pub a: f64,
    /// Quadratic coefficient.
    pub b: f64,
    /// Linear coefficient.
    pub c: f64,
}

/// Settings for the Newton inversion of the radial polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InversionConfig {
    /// Maximum Newton iterations per point.
    pub max_iters: usize,
    /// Stop when the radius update falls below this threshold.
    pub eps: f64,
}

impl Default for InversionConfig {
    fn default() -> Self {
        Self {
            max_iters: 20,
            eps: 1e-6,
        }
    }
}

impl RadialPolynomial {
    /// Constant term, chosen so the polynomial evaluates to 1 at r = 1.
    pub fn linear_term(&self) -> f64 {
        1.0 - self.a - self.b - self.c
    }

    /// True when all correction coefficients are zero.
    pub fn is_identity(&self) -> bool {
        self.a == 0.0 && self.b == 0.0 && self.c == 0.0
    }

    /// Map an ideal radius to the distorted source radius.
    pub fn distort(&self, r: f64) -> f64 {
        r * (((self.a * r + self.b) * r + self.c) * r + self.linear_term())
    }

    /// Radial scale factor `distort(r) / r`, well defined at r = 0.
    pub fn scale_at(&self, r: f64) -> f64 {
        ((self.a * r + self.b) * r + self.c) * r + self.linear_term()
    }

    /// Recover the ideal radius for a distorted radius by Newton iteration.
    ///
    /// Returns `None` when the iteration does not converge within
    /// `cfg.max_iters` steps or hits a flat derivative. Callers treat that
    /// single point as invalid rather than aborting the whole image.
    pub fn undistort(&self, r_dist: f64, cfg: &InversionConfig) -> Option<f64> {
        if self.is_identity() {
            return Some(r_dist);
        }
        let d = self.linear_term();
        let mut r = r_dist;
        for _ in 0..cfg.max_iters {
            // f(r) = r * (a r^3 + b r^2 + c r + d) - r_dist
            let f = self.distort(r) - r_dist;
            let df = ((4.0 * self.a * r + 3.0 * self.b) * r + 2.0 * self.c) * r + d;
            if df.abs() < 1e-12 || !df.is_finite() {
                return None;
            }
            let step = f / df;
            r -= step;
            if !r.is_finite() {
                return None;
            }
            if step.abs() < cfg.eps {
                return Some(r);
            }
        }
        None
    }
}

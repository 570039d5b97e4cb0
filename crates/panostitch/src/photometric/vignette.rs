//! Radial vignetting falloff model.

use serde::{Deserialize, Serialize};

/// Lower clamp applied before dividing by the falloff, so extreme radii
/// cannot blow up the correction.
const MIN_FALLOFF: f64 = 1e-3;

/// Even radial polynomial `1 + b r^2 + c r^4 + d r^6` evaluated at the
/// radius from the image center, normalized so the corner is at r = 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VignetteModel {
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl VignetteModel {
    pub fn new(b: f64, c: f64, d: f64) -> Self {
        Self { b, c, d }
    }

    /// True when no falloff is modeled.
    pub fn is_identity(&self) -> bool {
        self.b == 0.0 && self.c == 0.0 && self.d == 0.0
    }

    /// Brightness multiplier at normalized radius `r`, clamped away from
    /// zero so the inverse correction stays bounded.
    pub fn falloff(&self, r: f64) -> f64 {
        let r2 = r * r;
        let v = 1.0 + ((self.d * r2 + self.c) * r2 + self.b) * r2;
        v.max(MIN_FALLOFF)
    }
}

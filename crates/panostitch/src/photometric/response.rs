//! Camera response curve: nonlinear mapping between linear radiance and
//! encoded pixel values, invertible by construction.

use serde::{Deserialize, Serialize};

/// Lookup-table resolution for sampled curves.
const LUT_SIZE: usize = 4096;

/// Camera response curve over [0, 1].
///
/// `encode` maps linear values to encoded pixel values, `decode` is the
/// exact inverse. The analytic variants invert exactly; sampled curves are
/// inverted numerically once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCurve {
    /// No encoding, values are already linear.
    Linear,
    /// Power-law encoding `encoded = linear^(1/gamma)`.
    Gamma(f64),
    /// Sampled monotone curve with its numeric inverse.
    Lut {
        /// linear -> encoded, uniformly sampled over [0, 1].
        to_encoded: Vec<f32>,
        /// encoded -> linear, uniformly sampled over [0, 1].
        to_linear: Vec<f32>,
    },
}

impl Default for ResponseCurve {
    fn default() -> Self {
        ResponseCurve::Linear
    }
}

/// Evaluate a uniformly sampled lookup table at `t` in [0, 1] with linear
/// interpolation between samples.
fn eval_lut(lut: &[f32], t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let pos = t * (lut.len() - 1) as f32;
    let i = (pos as usize).min(lut.len() - 2);
    let frac = pos - i as f32;
    lut[i] * (1.0 - frac) + lut[i + 1] * frac
}

/// Numerically invert a semi-monotonic lookup table over [0, 1].
///
/// Non-monotonic wiggles are flattened first so the inverse is well defined.
fn invert_lut(lut: &[f32]) -> Vec<f32> {
    let n = lut.len();
    let mut curve = Vec::with_capacity(n);
    let mut prev_x = 0.0f32;
    let mut prev_y = 0.0f32;
    for (i, &v) in lut.iter().enumerate() {
        let x = (i as f32 / (n - 1) as f32).max(prev_x);
        let y = v.max(prev_y);
        curve.push((x, y));
        prev_x = x;
        prev_y = y;
    }

    let mut flipped = Vec::with_capacity(n);
    let mut prev_x = 0.0f32;
    let mut k = 0usize;
    for i in 0..n {
        let y = i as f32 / (n - 1) as f32;
        while k + 1 < n && curve[k + 1].1 < y {
            k += 1;
        }
        let (x0, y0) = curve[k];
        let (x1, y1) = curve[(k + 1).min(n - 1)];
        let x = if (y1 - y0).abs() < 1e-12 {
            x0
        } else {
            x0 + (x1 - x0) * (y - y0) / (y1 - y0)
        };
        let x = x.clamp(0.0, 1.0).max(prev_x);
        flipped.push(x);
        prev_x = x;
    }
    flipped
}

impl ResponseCurve {
    /// Build a curve from uniformly spaced `linear -> encoded` samples.
    pub fn from_samples(to_encoded: Vec<f32>) -> Self {
        let to_linear = invert_lut(&to_encoded);
        ResponseCurve::Lut {
            to_encoded,
            to_linear,
        }
    }

    /// Sample an analytic gamma curve into a LUT (useful for testing the
    /// sampled path against the exact one).
    pub fn sampled_gamma(gamma: f64) -> Self {
        let inv_g = 1.0 / gamma;
        let lut = (0..LUT_SIZE)
            .map(|i| {
                let t = i as f64 / (LUT_SIZE - 1) as f64;
                t.powf(inv_g) as f32
            })
            .collect();
        Self::from_samples(lut)
    }

    /// Linear radiance to encoded pixel value.
    pub fn encode(&self, linear: f32) -> f32 {
        let v = linear.clamp(0.0, 1.0);
        match self {
            ResponseCurve::Linear => v,
            ResponseCurve::Gamma(g) => (v as f64).powf(1.0 / g) as f32,
            ResponseCurve::Lut { to_encoded, .. } => eval_lut(to_encoded, v),
        }
    }

    /// Encoded pixel value to linear radiance.
    pub fn decode(&self, encoded: f32) -> f32 {
        let v = encoded.clamp(0.0, 1.0);
        match self {
            ResponseCurve::Linear => v,
            ResponseCurve::Gamma(g) => (v as f64).powf(*g) as f32,
            ResponseCurve::Lut { to_linear, .. } => eval_lut(to_linear, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_is_identity() {
        let r = ResponseCurve::Linear;
        assert_eq!(r.encode(0.42), 0.42);
        assert_eq!(r.decode(0.42), 0.42);
    }

    #[test]
    fn gamma_roundtrip_is_exact() {
        let r = ResponseCurve::Gamma(2.2);
        for i in 0..=100 {
            let v = i as f32 / 100.0;
            let back = r.decode(r.encode(v));
            assert!((back - v).abs() < 1e-6, "v={v} back={back}");
        }
    }

    #[test]
    fn sampled_gamma_roundtrip_within_tolerance() {
        let r = ResponseCurve::sampled_gamma(2.2);
        for i in 1..=100 {
            let v = i as f32 / 100.0;
            let back = r.decode(r.encode(v));
            let rel = (back - v).abs() / v.max(1e-3);
            assert!(rel < 1e-3, "v={v} back={back} rel={rel}");
        }
    }

    #[test]
    fn inverted_lut_is_monotone() {
        let r = ResponseCurve::sampled_gamma(1.8);
        if let ResponseCurve::Lut { to_linear, .. } = &r {
            for w in to_linear.windows(2) {
                assert!(w[1] >= w[0]);
            }
        } else {
            panic!("expected lut variant");
        }
    }
}

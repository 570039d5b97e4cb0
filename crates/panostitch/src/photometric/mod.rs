//! Photometric correction: exposure, white balance, vignetting and the
//! camera response curve, in both directions.
//!
//! `to_scene` converts a camera-recorded value to scene-referred radiance;
//! `to_camera` is its exact inverse. The remapper composes a source image's
//! `to_scene` with the output's `to_camera` so every contribution lands in
//! the same radiometric frame before blending.

mod response;
mod vignette;

pub use response::ResponseCurve;
pub use vignette::VignetteModel;

use serde::{Deserialize, Serialize};

/// Per-image photometric parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotometricParams {
    /// Exposure value; the recorded image is `2^ev` times brighter than the
    /// scene reference.
    pub exposure_ev: f64,
    /// White-balance gain applied to the red channel at capture.
    pub wb_red: f64,
    /// White-balance gain applied to the blue channel at capture.
    pub wb_blue: f64,
    /// Radial vignetting falloff.
    pub vignette: VignetteModel,
    /// Response curve between linear radiance and encoded values.
    pub response: ResponseCurve,
}

impl Default for PhotometricParams {
    fn default() -> Self {
        Self {
            exposure_ev: 0.0,
            wb_red: 1.0,
            wb_blue: 1.0,
            vignette: VignetteModel::default(),
            response: ResponseCurve::Linear,
        }
    }
}

/// A ready-to-apply photometric transform for one image.
///
/// Built once per remap so the exposure gain is not recomputed per pixel.
#[derive(Debug, Clone)]
pub struct PhotometricTransform {
    gain: f64,
    wb: [f64; 3],
    vignette: VignetteModel,
    response: ResponseCurve,
}

impl PhotometricTransform {
    pub fn new(params: &PhotometricParams) -> Self {
        Self {
            gain: params.exposure_ev.exp2(),
            wb: [params.wb_red, 1.0, params.wb_blue],
            vignette: params.vignette,
            response: params.response.clone(),
        }
    }

    /// Output-side transform: exposure only, linear response, no optics.
    pub fn for_output(exposure_ev: f64) -> Self {
        Self {
            gain: exposure_ev.exp2(),
            wb: [1.0, 1.0, 1.0],
            vignette: VignetteModel::default(),
            response: ResponseCurve::Linear,
        }
    }

    /// Camera-recorded RGB to scene-referred radiance. `r_norm` is the
    /// pixel's normalized radius from the image center.
    pub fn to_scene(&self, camera_rgb: [f32; 3], r_norm: f64) -> [f32; 3] {
        let falloff = self.vignette.falloff(r_norm);
        let mut out = [0.0f32; 3];
        for ch in 0..3 {
            let linear = self.response.decode(camera_rgb[ch]) as f64;
            out[ch] = (linear / (self.gain * self.wb[ch] * falloff)) as f32;
        }
        out
    }

    /// Scene-referred radiance to camera-recorded RGB; exact inverse of
    /// [`Self::to_scene`] up to response-curve resolution.
    pub fn to_camera(&self, scene_rgb: [f32; 3], r_norm: f64) -> [f32; 3] {
        let falloff = self.vignette.falloff(r_norm);
        let mut out = [0.0f32; 3];
        for ch in 0..3 {
            let linear = scene_rgb[ch] as f64 * self.gain * self.wb[ch] * falloff;
            out[ch] = self.response.encode(linear as f32);
        }
        out
    }
}

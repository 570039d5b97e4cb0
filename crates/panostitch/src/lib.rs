//! Panorama compositing core.
//!
//! The pipeline turns a set of described source images into one output
//! canvas:
//!
//! 1. **Geometry** ([`geometry`]) — projections, radial lens distortion and
//!    yaw/pitch/roll orientation, combined into a per-image
//!    [`ImageMapper`] between source and canvas pixels.
//! 2. **Photometric correction** ([`photometric`]) — exposure, white
//!    balance, vignetting and the response curve, applied in both
//!    directions so all contributions land scene-referred.
//! 3. **Remapping** ([`remap`]) — canvas-driven inverse sampling of each
//!    source into a [`RemappedRegion`] with feathered weights.
//! 4. **Blending** ([`blend`]) — order estimation over the overlap graph,
//!    then stacking, multiband seam blending or per-pixel difference.
//! 5. **Orchestration** ([`stitch`]) — parallel remapping, progress
//!    reporting and cooperative cancellation behind [`Stitcher`].
//!
//! Pixel decoding stays outside the crate: callers implement
//! [`PixelSource`] (or use [`ImageListSource`] over decoded frames).

pub mod blend;
pub mod canvas;
pub mod error;
pub mod geometry;
pub mod photometric;
pub mod remap;
pub mod source;
pub mod stitch;

#[cfg(test)]
mod test_utils;

pub use blend::{BlendMode, Blender, SeamConfig};
pub use canvas::{Canvas, CanvasOptions, CanvasRect, PixelFormat};
pub use error::{Result, StitchError};
pub use geometry::{ImageMapper, Orientation, PanoMapper, Projection, RadialPolynomial};
pub use photometric::{PhotometricParams, PhotometricTransform, ResponseCurve, VignetteModel};
pub use remap::{Interpolation, RemapConfig, RemappedRegion};
pub use source::{ImageListSource, PixelSource, SourceCrop, SourceImageGeometry};
pub use stitch::{CancelToken, NeverCancel, NullProgress, ProgressSink, Stitcher};

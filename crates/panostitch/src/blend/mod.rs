//! Blenders: composite remapped regions into the output canvas.
//!
//! All strategies share the same two-phase contract: `accumulate` each
//! region, then `finish` once to obtain the canvas. Strategy selection is
//! a closed enum rather than a trait object; there are three strategies
//! and the stitcher dispatches on the tag.

mod difference;
mod order;
mod seam;
mod stacking;

pub use difference::DifferenceBlender;
pub use order::{estimate_order, BlendOrder, OverlapGraph};
pub use seam::{SeamBlender, SeamConfig};
pub use stacking::StackingBlender;

use serde::{Deserialize, Serialize};

use crate::canvas::{Canvas, CanvasOptions};
use crate::error::{Result, StitchError};
use crate::remap::RemappedRegion;

/// Blend strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Overwrite in visiting order; no mixing.
    Stacking,
    /// Multiband blending with hidden seams.
    Seam(SeamConfig),
    /// Absolute difference of exactly two images.
    Difference,
}

impl Default for BlendMode {
    fn default() -> Self {
        BlendMode::Seam(SeamConfig::default())
    }
}

/// A blender mid-accumulation.
#[derive(Debug)]
pub enum Blender {
    Stacking(StackingBlender),
    Seam(SeamBlender),
    Difference(DifferenceBlender),
}

impl Blender {
    pub fn new(options: &CanvasOptions) -> Self {
        match options.blend {
            BlendMode::Stacking => Blender::Stacking(StackingBlender::new(options)),
            BlendMode::Seam(config) => Blender::Seam(SeamBlender::new(options, &config)),
            BlendMode::Difference => Blender::Difference(DifferenceBlender::new(options)),
        }
    }

    /// Feed one remapped region. Regions must arrive in blend order; the
    /// seam blender is order-independent but stacking is not.
    pub fn accumulate(&mut self, region: &RemappedRegion) -> Result<()> {
        match self {
            Blender::Stacking(b) => b.accumulate(region),
            Blender::Seam(b) => b.accumulate(region),
            Blender::Difference(b) => b.accumulate(region),
        }
    }

    /// Resolve the accumulation into the final canvas.
    pub fn finish(self) -> Result<Canvas> {
        match self {
            Blender::Stacking(b) => b.finish(),
            Blender::Seam(b) => b.finish(),
            Blender::Difference(b) => b.finish(),
        }
    }
}

/// Shared precondition: a region must lie fully inside the canvas.
fn check_bounds(canvas: &Canvas, region: &RemappedRegion) -> Result<()> {
    let rect = &region.rect;
    if rect.right() > canvas.width || rect.bottom() > canvas.height {
        return Err(StitchError::Accumulation(format!(
            "region {rect:?} of image {} exceeds {}x{} canvas",
            region.image_index, canvas.width, canvas.height
        )));
    }
    let expected = rect.area() as usize;
    if region.rgb.len() != expected || region.weight.len() != expected {
        return Err(StitchError::Accumulation(format!(
            "region buffers of image {} do not match {rect:?}",
            region.image_index
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelFormat;
    use crate::geometry::Projection;

    #[test]
    fn mode_selects_matching_blender() {
        let mut options = CanvasOptions::new(Projection::Equirectangular, 8, 8, 180.0);
        options.format = PixelFormat::Rgba8;

        options.blend = BlendMode::Stacking;
        assert!(matches!(Blender::new(&options), Blender::Stacking(_)));
        options.blend = BlendMode::Seam(SeamConfig { levels: 3 });
        assert!(matches!(Blender::new(&options), Blender::Seam(_)));
        options.blend = BlendMode::Difference;
        assert!(matches!(Blender::new(&options), Blender::Difference(_)));
    }

    #[test]
    fn mode_round_trips_through_json() {
        let mode = BlendMode::Seam(SeamConfig { levels: 5 });
        let json = serde_json::to_string(&mode).unwrap();
        let back: BlendMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mode);

        let plain: BlendMode = serde_json::from_str("\"stacking\"").unwrap();
        assert_eq!(plain, BlendMode::Stacking);
    }
}

//! Source image description and the pixel-data accessor boundary.
//!
//! The core never decodes files. Callers hand in [`SourceImageGeometry`]
//! records (produced by whatever project loader exists upstream) plus a
//! [`PixelSource`] that serves random-access reads. Decoding and caching
//! live behind that trait, with caller-controlled lifetime — there is no
//! process-wide cache in this crate.

use image::Rgba32FImage;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StitchError};
use crate::geometry::{Orientation, Projection, RadialPolynomial};
use crate::photometric::PhotometricParams;

/// Rectangular crop in source pixel coordinates, half-open on the
/// right/bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceCrop {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl SourceCrop {
    /// Full-image crop for the given dimensions.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// True when `(x, y)` falls inside the crop.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left as f64
            && x < self.right as f64
            && y >= self.top as f64
            && y < self.bottom as f64
    }
}

/// Everything the core needs to know about one source image.
///
/// Immutable for the duration of a stitch; the core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceImageGeometry {
    /// Pixel width of the decoded source.
    pub width: u32,
    /// Pixel height of the decoded source.
    pub height: u32,
    /// Projection kind of the source optics.
    pub projection: Projection,
    /// Horizontal field of view in degrees.
    pub hfov_deg: f64,
    /// Orientation within the panorama.
    #[serde(default)]
    pub orientation: Orientation,
    /// Radial lens distortion.
    #[serde(default)]
    pub distortion: RadialPolynomial,
    /// Optional crop restricting the valid source area.
    #[serde(default)]
    pub crop: Option<SourceCrop>,
    /// Exposure, white balance, vignetting and response parameters.
    #[serde(default)]
    pub photometric: PhotometricParams,
}

impl SourceImageGeometry {
    /// Minimal geometry: given dimensions, projection and field of view,
    /// everything else at neutral defaults.
    pub fn new(width: u32, height: u32, projection: Projection, hfov_deg: f64) -> Self {
        Self {
            width,
            height,
            projection,
            hfov_deg,
            orientation: Orientation::default(),
            distortion: RadialPolynomial::default(),
            crop: None,
            photometric: PhotometricParams::default(),
        }
    }

    /// Effective crop: the explicit one, or the full frame.
    pub fn effective_crop(&self) -> SourceCrop {
        self.crop
            .unwrap_or_else(|| SourceCrop::full(self.width, self.height))
    }
}

/// Random-access read interface over decoded source pixels.
///
/// Values are camera-referred, normalized to [0, 1] per channel, RGBA.
/// `fetch` returns `None` for out-of-range coordinates or unknown images;
/// the remapper treats such pixels as invalid.
pub trait PixelSource: Sync {
    /// Dimensions of the decoded image, or `None` if the index is unknown.
    fn dimensions(&self, image_index: usize) -> Option<(u32, u32)>;

    /// Read one pixel.
    fn fetch(&self, image_index: usize, x: u32, y: u32) -> Option<[f32; 4]>;
}

/// [`PixelSource`] over a list of decoded `image` crate frames.
pub struct ImageListSource {
    frames: Vec<Rgba32FImage>,
}

impl ImageListSource {
    /// Wrap pre-decoded frames. Conversion to RGBA f32 is done once here so
    /// per-pixel fetches are plain reads.
    pub fn new(frames: Vec<image::DynamicImage>) -> Self {
        Self {
            frames: frames.into_iter().map(|f| f.to_rgba32f()).collect(),
        }
    }

    /// Wrap frames and check them against the expected geometry dimensions.
    pub fn with_geometries(
        frames: Vec<image::DynamicImage>,
        geometries: &[SourceImageGeometry],
    ) -> Result<Self> {
        if frames.len() != geometries.len() {
            return Err(StitchError::PixelSource(format!(
                "{} decoded frames for {} geometries",
                frames.len(),
                geometries.len()
            )));
        }
        for (i, (f, g)) in frames.iter().zip(geometries).enumerate() {
            if f.width() != g.width || f.height() != g.height {
                return Err(StitchError::PixelSource(format!(
                    "image {i}: decoded {}x{} but geometry says {}x{}",
                    f.width(),
                    f.height(),
                    g.width,
                    g.height
                )));
            }
        }
        Ok(Self::new(frames))
    }
}

impl PixelSource for ImageListSource {
    fn dimensions(&self, image_index: usize) -> Option<(u32, u32)> {
        self.frames.get(image_index).map(|f| f.dimensions())
    }

    fn fetch(&self, image_index: usize, x: u32, y: u32) -> Option<[f32; 4]> {
        let frame = self.frames.get(image_index)?;
        if x >= frame.width() || y >= frame.height() {
            return None;
        }
        Some(frame.get_pixel(x, y).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_contains_is_half_open() {
        let c = SourceCrop {
            left: 10,
            top: 20,
            right: 30,
            bottom: 40,
        };
        assert!(c.contains(10.0, 20.0));
        assert!(c.contains(29.9, 39.9));
        assert!(!c.contains(30.0, 25.0));
        assert!(!c.contains(15.0, 40.0));
    }

    #[test]
    fn image_list_source_mismatch_is_rejected() {
        let geo = vec![SourceImageGeometry::new(8, 8, Projection::Rectilinear, 50.0)];
        let frames = vec![image::DynamicImage::new_rgb8(4, 4)];
        assert!(ImageListSource::with_geometries(frames, &geo).is_err());
    }

    #[test]
    fn image_list_source_fetch_bounds() {
        let src = ImageListSource::new(vec![image::DynamicImage::new_rgb8(4, 4)]);
        assert!(src.fetch(0, 3, 3).is_some());
        assert!(src.fetch(0, 4, 0).is_none());
        assert!(src.fetch(1, 0, 0).is_none());
    }
}

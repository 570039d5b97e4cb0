//! Output canvas: options, pixel formats and the final pixel buffer.

use serde::{Deserialize, Serialize};

use crate::blend::BlendMode;
use crate::error::{Result, StitchError};
use crate::geometry::Projection;

/// Rectangle in canvas pixel coordinates, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CanvasRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Intersection of two rectangles; empty result has zero dimensions.
    pub fn intersect(&self, other: &CanvasRect) -> CanvasRect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        CanvasRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }

    /// Pixel count of the rectangle.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &CanvasRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Output pixel format tag. The pipeline computes in f32 and instantiates
/// the concrete component type once, at the encode boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
    Rgb16,
    Rgba16,
    Rgb32f,
    Rgba32f,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Rgb16 | PixelFormat::Rgb32f => 3,
            PixelFormat::Rgba8 | PixelFormat::Rgba16 | PixelFormat::Rgba32f => 4,
        }
    }
}

/// Numeric component a canvas can be encoded into.
pub trait Component: Copy {
    /// Quantize a normalized [0, 1] value.
    fn from_norm(v: f32) -> Self;
    /// Append the component's little-endian bytes.
    fn write_to(self, out: &mut Vec<u8>);
}

impl Component for u8 {
    fn from_norm(v: f32) -> Self {
        (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
    }
    fn write_to(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl Component for u16 {
    fn from_norm(v: f32) -> Self {
        (v.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16
    }
    fn write_to(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Component for f32 {
    fn from_norm(v: f32) -> Self {
        v
    }
    fn write_to(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

/// Options describing the output canvas and how to blend into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasOptions {
    /// Output projection.
    pub projection: Projection,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Horizontal field of view of the canvas in degrees.
    pub hfov_deg: f64,
    /// Output pixel format.
    pub format: PixelFormat,
    /// Output exposure value, applied after blending in scene space.
    #[serde(default)]
    pub exposure_ev: f64,
    /// Blend strategy.
    #[serde(default)]
    pub blend: BlendMode,
    /// Optional output crop applied after blending.
    #[serde(default)]
    pub crop: Option<CanvasRect>,
}

impl CanvasOptions {
    pub fn new(projection: Projection, width: u32, height: u32, hfov_deg: f64) -> Self {
        Self {
            projection,
            width,
            height,
            hfov_deg,
            format: PixelFormat::Rgba8,
            exposure_ev: 0.0,
            blend: BlendMode::default(),
            crop: None,
        }
    }

    /// Full-canvas rectangle.
    pub fn full_rect(&self) -> CanvasRect {
        CanvasRect::new(0, 0, self.width, self.height)
    }

    /// Fail-fast validation, run before any remapping work.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StitchError::Config(format!(
                "canvas dimensions {}x{} must be positive",
                self.width, self.height
            )));
        }
        if !(self.hfov_deg > 0.0) || self.hfov_deg > 360.0 {
            return Err(StitchError::Config(format!(
                "canvas hfov {} out of range (0, 360]",
                self.hfov_deg
            )));
        }
        if self.projection == Projection::Rectilinear && self.hfov_deg >= 180.0 {
            return Err(StitchError::Config(
                "rectilinear canvas hfov must be below 180 degrees".into(),
            ));
        }
        if let Some(crop) = &self.crop {
            if crop.is_empty() || !self.full_rect().contains_rect(crop) {
                return Err(StitchError::Config(format!(
                    "canvas crop {crop:?} outside {}x{} canvas",
                    self.width, self.height
                )));
            }
        }
        Ok(())
    }
}

/// The composited output: scene pixels plus coverage alpha.
///
/// Pixels are stored as RGBA f32; alpha 0 marks the "unset" sentinel for
/// canvas areas no source image covered.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<[f32; 4]>,
}

impl Canvas {
    /// Transparent-black canvas of the given size.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            pixels: vec![[0.0; 4]; width as usize * height as usize],
        }
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Crop to a sub-rectangle (used for the output crop option).
    pub fn cropped(&self, rect: &CanvasRect) -> Canvas {
        let mut out = Canvas::new(rect.width, rect.height, self.format);
        for y in 0..rect.height {
            for x in 0..rect.width {
                let di = out.index(x, y);
                out.pixels[di] = self.pixels[self.index(rect.x + x, rect.y + y)];
            }
        }
        out
    }

    fn encode_components<C: Component>(&self, channels: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * channels);
        for px in &self.pixels {
            for ch in 0..channels {
                C::from_norm(px[ch]).write_to(&mut out);
            }
        }
        out
    }

    /// Encode the canvas into its declared format, little-endian component
    /// order, row-major.
    pub fn encode(&self) -> Vec<u8> {
        let ch = self.format.channels();
        match self.format {
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => self.encode_components::<u8>(ch),
            PixelFormat::Rgb16 | PixelFormat::Rgba16 => self.encode_components::<u16>(ch),
            PixelFormat::Rgb32f | PixelFormat::Rgba32f => self.encode_components::<f32>(ch),
        }
    }

    /// Convert into an `image` crate buffer for saving.
    pub fn to_dynamic(&self) -> image::DynamicImage {
        let (w, h) = (self.width, self.height);
        match self.format {
            PixelFormat::Rgb8 => {
                let data: Vec<u8> = self
                    .pixels
                    .iter()
                    .flat_map(|p| [u8::from_norm(p[0]), u8::from_norm(p[1]), u8::from_norm(p[2])])
                    .collect();
                image::DynamicImage::ImageRgb8(
                    image::RgbImage::from_raw(w, h, data).expect("sized buffer"),
                )
            }
            PixelFormat::Rgba8 => {
                let data: Vec<u8> = self
                    .pixels
                    .iter()
                    .flat_map(|p| {
                        [
                            u8::from_norm(p[0]),
                            u8::from_norm(p[1]),
                            u8::from_norm(p[2]),
                            u8::from_norm(p[3]),
                        ]
                    })
                    .collect();
                image::DynamicImage::ImageRgba8(
                    image::RgbaImage::from_raw(w, h, data).expect("sized buffer"),
                )
            }
            PixelFormat::Rgb16 => {
                let data: Vec<u16> = self
                    .pixels
                    .iter()
                    .flat_map(|p| {
                        [
                            u16::from_norm(p[0]),
                            u16::from_norm(p[1]),
                            u16::from_norm(p[2]),
                        ]
                    })
                    .collect();
                image::DynamicImage::ImageRgb16(
                    image::ImageBuffer::from_raw(w, h, data).expect("sized buffer"),
                )
            }
            PixelFormat::Rgba16 => {
                let data: Vec<u16> = self
                    .pixels
                    .iter()
                    .flat_map(|p| {
                        [
                            u16::from_norm(p[0]),
                            u16::from_norm(p[1]),
                            u16::from_norm(p[2]),
                            u16::from_norm(p[3]),
                        ]
                    })
                    .collect();
                image::DynamicImage::ImageRgba16(
                    image::ImageBuffer::from_raw(w, h, data).expect("sized buffer"),
                )
            }
            PixelFormat::Rgb32f => {
                let data: Vec<f32> = self
                    .pixels
                    .iter()
                    .flat_map(|p| [p[0], p[1], p[2]])
                    .collect();
                image::DynamicImage::ImageRgb32F(
                    image::ImageBuffer::from_raw(w, h, data).expect("sized buffer"),
                )
            }
            PixelFormat::Rgba32f => {
                let data: Vec<f32> = self.pixels.iter().flat_map(|p| *p).collect();
                image::DynamicImage::ImageRgba32F(
                    image::ImageBuffer::from_raw(w, h, data).expect("sized buffer"),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_intersection() {
        let a = CanvasRect::new(0, 0, 100, 50);
        let b = CanvasRect::new(60, 10, 100, 100);
        let i = a.intersect(&b);
        assert_eq!(i, CanvasRect::new(60, 10, 40, 40));
        let disjoint = a.intersect(&CanvasRect::new(200, 0, 10, 10));
        assert!(disjoint.is_empty());
    }

    #[test]
    fn options_validation_rejects_degenerate_canvas() {
        let mut opts = CanvasOptions::new(Projection::Equirectangular, 0, 100, 180.0);
        assert!(opts.validate().is_err());
        opts.width = 100;
        assert!(opts.validate().is_ok());
        opts.crop = Some(CanvasRect::new(50, 50, 100, 100));
        assert!(opts.validate().is_err());
    }

    #[test]
    fn component_quantization() {
        assert_eq!(u8::from_norm(1.0), 255);
        assert_eq!(u8::from_norm(0.0), 0);
        assert_eq!(u16::from_norm(0.5), 32768);
    }

    #[test]
    fn encode_size_matches_format() {
        let c = Canvas::new(4, 2, PixelFormat::Rgba16);
        assert_eq!(c.encode().len(), 4 * 2 * 4 * 2);
        let c = Canvas::new(4, 2, PixelFormat::Rgb32f);
        assert_eq!(c.encode().len(), 4 * 2 * 3 * 4);
    }

    #[test]
    fn cropped_copies_subrect() {
        let mut c = Canvas::new(4, 4, PixelFormat::Rgba8);
        let idx = c.index(2, 1);
        c.pixels[idx] = [0.5, 0.25, 0.125, 1.0];
        let sub = c.cropped(&CanvasRect::new(2, 1, 2, 2));
        assert_eq!(sub.pixels[0], [0.5, 0.25, 0.125, 1.0]);
    }
}

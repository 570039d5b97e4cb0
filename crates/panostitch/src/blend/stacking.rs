//! Stacking blender: painter's-algorithm overwrite in visiting order.

use crate::canvas::{Canvas, CanvasOptions};
use crate::error::Result;
use crate::remap::RemappedRegion;

use super::check_bounds;

/// Last-writer-wins accumulation. Every pixel with any contribution also
/// records which image owns it, so the result is fully deterministic for a
/// fixed visiting order.
#[derive(Debug)]
pub struct StackingBlender {
    canvas: Canvas,
    /// Owning image index per pixel, `NO_OWNER` where nothing landed yet.
    owner: Vec<u32>,
}

const NO_OWNER: u32 = u32::MAX;

impl StackingBlender {
    pub fn new(options: &CanvasOptions) -> Self {
        let canvas = Canvas::new(options.width, options.height, options.format);
        let len = canvas.pixels.len();
        Self {
            canvas,
            owner: vec![NO_OWNER; len],
        }
    }

    pub fn accumulate(&mut self, region: &RemappedRegion) -> Result<()> {
        check_bounds(&self.canvas, region)?;
        for ry in 0..region.rect.height {
            for rx in 0..region.rect.width {
                let ri = region.index(rx, ry);
                if region.weight[ri] <= 0.0 {
                    continue;
                }
                let ci = self
                    .canvas
                    .index(region.rect.x + rx, region.rect.y + ry);
                let [r, g, b] = region.rgb[ri];
                self.canvas.pixels[ci] = [r, g, b, 1.0];
                self.owner[ci] = region.image_index as u32;
            }
        }
        Ok(())
    }

    /// Index of the image currently owning a pixel, if any has landed.
    pub fn owner(&self, x: u32, y: u32) -> Option<usize> {
        match self.owner[self.canvas.index(x, y)] {
            NO_OWNER => None,
            i => Some(i as usize),
        }
    }

    pub fn finish(self) -> Result<Canvas> {
        Ok(self.canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasRect, PixelFormat};
    use crate::geometry::Projection;

    fn options() -> CanvasOptions {
        let mut o = CanvasOptions::new(Projection::Equirectangular, 16, 16, 180.0);
        o.format = PixelFormat::Rgba8;
        o
    }

    fn region(index: usize, x: u32, w: u32, value: f32) -> RemappedRegion {
        RemappedRegion {
            image_index: index,
            rect: CanvasRect::new(x, 0, w, 16),
            rgb: vec![[value; 3]; (w * 16) as usize],
            weight: vec![1.0; (w * 16) as usize],
        }
    }

    #[test]
    fn later_regions_overwrite_earlier_ones() {
        let mut b = StackingBlender::new(&options());
        b.accumulate(&region(0, 0, 10, 0.2)).unwrap();
        b.accumulate(&region(1, 6, 10, 0.9)).unwrap();
        assert_eq!(b.owner(2, 3), Some(0));
        assert_eq!(b.owner(8, 3), Some(1));
        assert_eq!(b.owner(0, 15), Some(0));
        let canvas = b.finish().unwrap();
        assert!((canvas.pixels[canvas.index(2, 3)][0] - 0.2).abs() < 1e-6);
        assert!((canvas.pixels[canvas.index(8, 3)][0] - 0.9).abs() < 1e-6);
        assert_eq!(canvas.pixels[canvas.index(8, 3)][3], 1.0);
    }

    #[test]
    fn untouched_pixels_stay_transparent() {
        let mut b = StackingBlender::new(&options());
        b.accumulate(&region(0, 0, 4, 0.5)).unwrap();
        let canvas = b.finish().unwrap();
        assert_eq!(canvas.pixels[canvas.index(10, 10)], [0.0; 4]);
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let run = || {
            let mut b = StackingBlender::new(&options());
            b.accumulate(&region(0, 0, 10, 0.25)).unwrap();
            b.accumulate(&region(1, 4, 10, 0.75)).unwrap();
            b.finish().unwrap()
        };
        let a = run();
        let b = run();
        for (pa, pb) in a.pixels.iter().zip(&b.pixels) {
            assert_eq!(pa.map(f32::to_bits), pb.map(f32::to_bits));
        }
    }

    #[test]
    fn out_of_bounds_region_is_rejected() {
        let mut b = StackingBlender::new(&options());
        let err = b.accumulate(&region(0, 10, 10, 0.5)).unwrap_err();
        assert!(matches!(err, crate::error::StitchError::Accumulation(_)));
    }
}

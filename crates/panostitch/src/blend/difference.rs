//! Difference blender: per-pixel absolute difference of exactly two images.
//!
//! Diagnostic mode for judging alignment quality. Where both images cover a
//! pixel the output is `|a - b|`, so a perfect registration renders black
//! in the overlap and any residual parallax or drift lights up.

use crate::canvas::{Canvas, CanvasOptions};
use crate::error::{Result, StitchError};
use crate::remap::RemappedRegion;

use super::check_bounds;

#[derive(Debug)]
pub struct DifferenceBlender {
    canvas: Canvas,
    /// First accumulated image, splatted to canvas size.
    first: Option<Plane>,
    regions_seen: usize,
}

#[derive(Debug)]
struct Plane {
    rgb: Vec<[f32; 3]>,
    covered: Vec<bool>,
}

impl DifferenceBlender {
    pub fn new(options: &CanvasOptions) -> Self {
        Self {
            canvas: Canvas::new(options.width, options.height, options.format),
            first: None,
            regions_seen: 0,
        }
    }

    pub fn accumulate(&mut self, region: &RemappedRegion) -> Result<()> {
        check_bounds(&self.canvas, region)?;
        self.regions_seen += 1;
        if self.regions_seen > 2 {
            return Err(StitchError::Accumulation(format!(
                "difference blending takes exactly two images, got {} regions",
                self.regions_seen
            )));
        }

        let width = self.canvas.width;
        match &mut self.first {
            None => {
                let len = self.canvas.pixels.len();
                let mut plane = Plane {
                    rgb: vec![[0.0; 3]; len],
                    covered: vec![false; len],
                };
                for_each_covered(region, width, |ci, rgb| {
                    plane.rgb[ci] = rgb;
                    plane.covered[ci] = true;
                });
                self.first = Some(plane);
            }
            Some(plane) => {
                let pixels = &mut self.canvas.pixels;
                for_each_covered(region, width, |ci, rgb| {
                    if plane.covered[ci] {
                        let a = plane.rgb[ci];
                        pixels[ci] = [
                            (a[0] - rgb[0]).abs(),
                            (a[1] - rgb[1]).abs(),
                            (a[2] - rgb[2]).abs(),
                            1.0,
                        ];
                    }
                });
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Result<Canvas> {
        if self.regions_seen != 2 {
            return Err(StitchError::Accumulation(format!(
                "difference blending takes exactly two images, got {}",
                self.regions_seen
            )));
        }
        Ok(self.canvas)
    }
}

fn for_each_covered(region: &RemappedRegion, canvas_width: u32, mut f: impl FnMut(usize, [f32; 3])) {
    for ry in 0..region.rect.height {
        for rx in 0..region.rect.width {
            let ri = region.index(rx, ry);
            if region.weight[ri] <= 0.0 {
                continue;
            }
            let ci = ((region.rect.y + ry) * canvas_width + region.rect.x + rx) as usize;
            f(ci, region.rgb[ri]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasRect, PixelFormat};
    use crate::geometry::Projection;

    fn options() -> CanvasOptions {
        let mut o = CanvasOptions::new(Projection::Equirectangular, 32, 16, 180.0);
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
    fn overlap_shows_absolute_difference() {
        let mut b = DifferenceBlender::new(&options());
        b.accumulate(&region(0, 0, 20, 0.7)).unwrap();
        b.accumulate(&region(1, 10, 20, 0.2)).unwrap();
        let canvas = b.finish().unwrap();
        let p = canvas.pixels[canvas.index(15, 8)];
        assert!((p[0] - 0.5).abs() < 1e-6);
        assert_eq!(p[3], 1.0);
        // Outside the overlap nothing is written.
        assert_eq!(canvas.pixels[canvas.index(2, 8)], [0.0; 4]);
        assert_eq!(canvas.pixels[canvas.index(28, 8)], [0.0; 4]);
    }

    #[test]
    fn identical_images_difference_to_black() {
        let mut b = DifferenceBlender::new(&options());
        b.accumulate(&region(0, 4, 20, 0.42)).unwrap();
        b.accumulate(&region(1, 4, 20, 0.42)).unwrap();
        let canvas = b.finish().unwrap();
        let p = canvas.pixels[canvas.index(10, 5)];
        assert_eq!(p[..3], [0.0; 3]);
        assert_eq!(p[3], 1.0);
    }

    #[test]
    fn wrong_image_count_is_an_error() {
        let mut b = DifferenceBlender::new(&options());
        b.accumulate(&region(0, 0, 10, 0.5)).unwrap();
        assert!(matches!(
            b.finish(),
            Err(StitchError::Accumulation(_))
        ));

        let mut b = DifferenceBlender::new(&options());
        b.accumulate(&region(0, 0, 10, 0.5)).unwrap();
        b.accumulate(&region(1, 0, 10, 0.5)).unwrap();
        assert!(b.accumulate(&region(2, 0, 10, 0.5)).is_err());
    }
}

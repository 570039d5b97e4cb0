//! Seam blender: Burt-Adelson multiband blending.
//!
//! Each region is decomposed into a Laplacian pyramid and accumulated into
//! per-level canvas-sized sum/weight planes. Low-frequency bands mix over
//! wide areas while high-frequency detail transitions sharply, which hides
//! exposure steps without ghosting edges. Normalization happens once at
//! finish, so accumulation order does not affect the result.
//!
//! Contributions are weighted by each image's feathered validity ramp at
//! every level rather than partitioned into exclusive ownership masks:
//! all covering images mix everywhere they overlap, with band-dependent
//! transition widths. Weights stay nonnegative, so blended values remain
//! in the convex hull of the inputs.

use crate::canvas::{Canvas, CanvasOptions, CanvasRect};
use crate::error::Result;
use crate::remap::RemappedRegion;

use super::check_bounds;

/// Seam blender tuning.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SeamConfig {
    /// Pyramid depth. Clamped to `2..=8` at construction.
    pub levels: u32,
}

impl Default for SeamConfig {
    fn default() -> Self {
        Self { levels: 4 }
    }
}

/// One pyramid level of the running accumulation: weighted band sums plus
/// the weight plane used to normalize them at finish.
#[derive(Debug)]
struct LevelPlane {
    width: u32,
    height: u32,
    sum: Vec<[f32; 3]>,
    weight: Vec<f32>,
}

impl LevelPlane {
    fn new(width: u32, height: u32) -> Self {
        let len = (width * height) as usize;
        Self {
            width,
            height,
            sum: vec![[0.0; 3]; len],
            weight: vec![0.0; len],
        }
    }
}

#[derive(Debug)]
pub struct SeamBlender {
    canvas: Canvas,
    levels: Vec<LevelPlane>,
}

/// Minimum weight a pixel needs to count as covered.
const WEIGHT_EPS: f32 = 1e-6;

impl SeamBlender {
    pub fn new(options: &CanvasOptions, config: &SeamConfig) -> Self {
        let canvas = Canvas::new(options.width, options.height, options.format);
        let depth = config.levels.clamp(2, 8);
        let mut levels = Vec::with_capacity(depth as usize);
        let (mut w, mut h) = (options.width, options.height);
        for _ in 0..depth {
            levels.push(LevelPlane::new(w, h));
            w = half_dim(w);
            h = half_dim(h);
        }
        Self { canvas, levels }
    }

    pub fn accumulate(&mut self, region: &RemappedRegion) -> Result<()> {
        check_bounds(&self.canvas, region)?;

        let depth = self.levels.len() as u32;
        let rect = aligned_rect(
            &region.rect,
            1u32 << (depth - 1),
            self.canvas.width,
            self.canvas.height,
        );
        let (rgb, weight) = pad_region(region, &rect);

        // Gaussian pyramid of both the color and the feather weight.
        let mut gauss = vec![Pyramid {
            width: rect.width,
            height: rect.height,
            rgb,
            weight,
        }];
        for _ in 1..depth {
            let prev = gauss.last().expect("at least the base level");
            gauss.push(prev.downsample());
        }

        // Laplacian band at each level; the coarsest keeps its Gaussian.
        for level in 0..depth as usize {
            let band = if level + 1 < depth as usize {
                gauss[level].subtract_upsampled(&gauss[level + 1])
            } else {
                gauss[level].rgb.clone()
            };
            let g = &gauss[level];
            let plane = &mut self.levels[level];
            let ox = rect.x >> level;
            let oy = rect.y >> level;
            for y in 0..g.height {
                let py = oy + y;
                if py >= plane.height {
                    break;
                }
                for x in 0..g.width {
                    let px = ox + x;
                    if px >= plane.width {
                        break;
                    }
                    let ri = (y * g.width + x) as usize;
                    let w = g.weight[ri];
                    if w <= WEIGHT_EPS {
                        continue;
                    }
                    let pi = (py * plane.width + px) as usize;
                    for ch in 0..3 {
                        plane.sum[pi][ch] += band[ri][ch] * w;
                    }
                    plane.weight[pi] += w;
                }
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<Canvas> {
        // Normalize each band, then collapse coarse-to-fine.
        for plane in &mut self.levels {
            for i in 0..plane.sum.len() {
                let w = plane.weight[i];
                if w > WEIGHT_EPS {
                    for ch in 0..3 {
                        plane.sum[i][ch] /= w;
                    }
                }
            }
        }

        let weight = std::mem::take(&mut self.levels[0].weight);
        let coarsest = self.levels.pop().expect("at least two levels");
        let (mut acc, mut acc_w, mut acc_h) = (coarsest.sum, coarsest.width, coarsest.height);
        while let Some(plane) = self.levels.pop() {
            let up = upsample(&acc, acc_w, acc_h, plane.width, plane.height);
            acc = plane.sum;
            for (dst, src) in acc.iter_mut().zip(&up) {
                for ch in 0..3 {
                    dst[ch] += src[ch];
                }
            }
            acc_w = plane.width;
            acc_h = plane.height;
        }

        // Coverage comes from the finest weight plane; uncovered pixels
        // keep the alpha-zero sentinel.
        for i in 0..self.canvas.pixels.len() {
            if weight[i] > WEIGHT_EPS {
                let [r, g, b] = acc[i];
                self.canvas.pixels[i] = [r, g, b, 1.0];
            }
        }
        Ok(self.canvas)
    }
}

/// Ceil-halved pyramid dimension, never below one.
fn half_dim(d: u32) -> u32 {
    ((d + 1) / 2).max(1)
}

/// Expand `rect` so its origin and size align to `align`, clamped to the
/// canvas. Alignment keeps downsampled grids consistent across levels.
fn aligned_rect(rect: &CanvasRect, align: u32, canvas_w: u32, canvas_h: u32) -> CanvasRect {
    let x = (rect.x / align) * align;
    let y = (rect.y / align) * align;
    let right = rect.right().div_ceil(align) * align;
    let bottom = rect.bottom().div_ceil(align) * align;
    CanvasRect::new(
        x,
        y,
        (right - x).min(canvas_w.div_ceil(align) * align - x),
        (bottom - y).min(canvas_h.div_ceil(align) * align - y),
    )
}

/// Copy the region into an aligned buffer. Color outside the region is
/// edge-replicated so pyramid filtering near the border does not bleed in
/// black; weight outside stays zero so the padding never contributes.
fn pad_region(region: &RemappedRegion, rect: &CanvasRect) -> (Vec<[f32; 3]>, Vec<f32>) {
    let len = (rect.width * rect.height) as usize;
    let mut rgb = vec![[0.0f32; 3]; len];
    let mut weight = vec![0.0f32; len];
    let rr = &region.rect;
    for y in 0..rect.height {
        let cy = rect.y + y;
        let sy = cy.clamp(rr.y, rr.bottom() - 1) - rr.y;
        for x in 0..rect.width {
            let cx = rect.x + x;
            let sx = cx.clamp(rr.x, rr.right() - 1) - rr.x;
            let si = region.index(sx, sy);
            let di = (y * rect.width + x) as usize;
            rgb[di] = region.rgb[si];
            if cx >= rr.x && cx < rr.right() && cy >= rr.y && cy < rr.bottom() {
                weight[di] = region.weight[si];
            }
        }
    }
    (rgb, weight)
}

/// One Gaussian-pyramid level of a single region.
struct Pyramid {
    width: u32,
    height: u32,
    rgb: Vec<[f32; 3]>,
    weight: Vec<f32>,
}

impl Pyramid {
    /// 2x2 box filter and decimate.
    fn downsample(&self) -> Pyramid {
        let w = half_dim(self.width);
        let h = half_dim(self.height);
        let mut rgb = vec![[0.0f32; 3]; (w * h) as usize];
        let mut weight = vec![0.0f32; (w * h) as usize];
        for y in 0..h {
            for x in 0..w {
                let mut acc = [0.0f32; 3];
                let mut wacc = 0.0f32;
                let mut count = 0.0f32;
                for dy in 0..2 {
                    let sy = (2 * y + dy).min(self.height - 1);
                    for dx in 0..2 {
                        let sx = (2 * x + dx).min(self.width - 1);
                        let si = (sy * self.width + sx) as usize;
                        for ch in 0..3 {
                            acc[ch] += self.rgb[si][ch];
                        }
                        wacc += self.weight[si];
                        count += 1.0;
                    }
                }
                let di = (y * w + x) as usize;
                for ch in 0..3 {
                    rgb[di][ch] = acc[ch] / count;
                }
                weight[di] = wacc / count;
            }
        }
        Pyramid {
            width: w,
            height: h,
            rgb,
            weight,
        }
    }

    /// This level's color minus the bilinearly upsampled coarser level.
    fn subtract_upsampled(&self, coarse: &Pyramid) -> Vec<[f32; 3]> {
        let up = upsample(
            &coarse.rgb,
            coarse.width,
            coarse.height,
            self.width,
            self.height,
        );
        self.rgb
            .iter()
            .zip(&up)
            .map(|(fine, low)| [fine[0] - low[0], fine[1] - low[1], fine[2] - low[2]])
            .collect()
    }
}

/// Bilinear upsample of a coarse plane onto a fine grid. Sample positions
/// mirror the downsampling (each coarse texel covers a 2x2 fine block).
fn upsample(
    coarse: &[[f32; 3]],
    cw: u32,
    ch: u32,
    fw: u32,
    fh: u32,
) -> Vec<[f32; 3]> {
    let mut out = vec![[0.0f32; 3]; (fw * fh) as usize];
    for y in 0..fh {
        let sy = (y as f32 - 0.5) * 0.5;
        let y0 = sy.floor().clamp(0.0, (ch - 1) as f32) as u32;
        let y1 = (y0 + 1).min(ch - 1);
        let fy = (sy - y0 as f32).clamp(0.0, 1.0);
        for x in 0..fw {
            let sx = (x as f32 - 0.5) * 0.5;
            let x0 = sx.floor().clamp(0.0, (cw - 1) as f32) as u32;
            let x1 = (x0 + 1).min(cw - 1);
            let fx = (sx - x0 as f32).clamp(0.0, 1.0);
            let p00 = coarse[(y0 * cw + x0) as usize];
            let p10 = coarse[(y0 * cw + x1) as usize];
            let p01 = coarse[(y1 * cw + x0) as usize];
            let p11 = coarse[(y1 * cw + x1) as usize];
            let di = (y * fw + x) as usize;
            for chn in 0..3 {
                let top = p00[chn] + (p10[chn] - p00[chn]) * fx;
                let bot = p01[chn] + (p11[chn] - p01[chn]) * fx;
                out[di][chn] = top + (bot - top) * fy;
            }
        }
    }
    out
}

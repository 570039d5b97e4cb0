//! Canvas-driven remapping of one source image.
//!
//! The remapper traces the source outline to find the canvas region the
//! image can affect, then pulls every canvas pixel in that region back
//! through the inverse mapping, samples the source, applies photometric
//! correction and assigns a feathered validity weight.

use rayon::prelude::*;

use crate::canvas::{CanvasOptions, CanvasRect};
use crate::error::{Result, StitchError};
use crate::geometry::{ImageMapper, PanoMapper};
use crate::photometric::PhotometricTransform;
use crate::source::{PixelSource, SourceImageGeometry};

/// Interpolation kernel used when sampling source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Nearest,
    Bilinear,
}

/// Remapper tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RemapConfig {
    /// Width in source pixels of the weight ramp from the valid-area
    /// boundary to full contribution.
    pub feather_px: f64,
    /// Sampling kernel.
    pub interpolation: Interpolation,
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self {
            feather_px: 16.0,
            interpolation: Interpolation::Bilinear,
        }
    }
}

/// One source image remapped into canvas space: a dense pixel rectangle
/// plus a parallel weight buffer. Transient; consumed by a blender.
#[derive(Debug, Clone)]
pub struct RemappedRegion {
    /// Index of the source image this region came from.
    pub image_index: usize,
    /// Canvas rectangle the buffers cover.
    pub rect: CanvasRect,
    /// Scene-referred RGB per canvas pixel, row-major.
    pub rgb: Vec<[f32; 3]>,
    /// Contribution weight per pixel, 0 = no contribution.
    pub weight: Vec<f32>,
}

impl RemappedRegion {
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.rect.width as usize + x as usize
    }
}

/// Number of samples traced along each crop edge for ROI estimation.
const OUTLINE_SAMPLES: usize = 32;

/// Estimate the canvas bounding rectangle of one source image by tracing
/// its crop outline through the forward mapping.
///
/// Falls back to the full canvas when too few outline points map validly
/// (e.g. the outline itself is behind the output projection's domain but
/// the interior is not).
pub fn estimate_roi(mapper: &ImageMapper, geometry: &SourceImageGeometry, canvas: &CanvasOptions) -> CanvasRect {
    let crop = geometry.effective_crop();
    let (l, t) = (crop.left as f64, crop.top as f64);
    // Stay strictly inside the half-open crop so the traced points are valid.
    let (r, b) = (crop.right as f64 - 1e-3, crop.bottom as f64 - 1e-3);

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let mut valid = 0usize;
    let mut total = 0usize;

    let mut trace = |x: f64, y: f64| {
        total += 1;
        if let Some([cx, cy]) = mapper.source_to_canvas([x, y]) {
            valid += 1;
            min_x = min_x.min(cx);
            min_y = min_y.min(cy);
            max_x = max_x.max(cx);
            max_y = max_y.max(cy);
        }
    };

    for i in 0..=OUTLINE_SAMPLES {
        let f = i as f64 / OUTLINE_SAMPLES as f64;
        trace(l + (r - l) * f, t);
        trace(l + (r - l) * f, b);
        trace(l, t + (b - t) * f);
        trace(r, t + (b - t) * f);
    }
    // A sparse interior grid catches projections where the outline wraps.
    for iy in 1..4 {
        for ix in 1..4 {
            trace(
                l + (r - l) * ix as f64 / 4.0,
                t + (b - t) * iy as f64 / 4.0,
            );
        }
    }

    let full = canvas.full_rect();
    if valid * 2 < total {
        // Most of the outline failed to map; the cheap estimate is not
        // trustworthy, scan the whole canvas instead.
        return full;
    }

    let margin = 2.0;
    let x0 = ((min_x - margin).floor().max(0.0)) as u32;
    let y0 = ((min_y - margin).floor().max(0.0)) as u32;
    let x1 = ((max_x + margin).ceil().min(canvas.width as f64)) as u32;
    let y1 = ((max_y + margin).ceil().min(canvas.height as f64)) as u32;
    CanvasRect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0)).intersect(&full)
}

fn sample(
    source: &dyn PixelSource,
    image_index: usize,
    width: u32,
    height: u32,
    x: f64,
    y: f64,
    interpolation: Interpolation,
) -> Option<[f32; 4]> {
    match interpolation {
        Interpolation::Nearest => {
            let xi = x.round().clamp(0.0, width as f64 - 1.0) as u32;
            let yi = y.round().clamp(0.0, height as f64 - 1.0) as u32;
            source.fetch(image_index, xi, yi)
        }
        Interpolation::Bilinear => {
            let x0f = x.floor();
            let y0f = y.floor();
            let fx = (x - x0f) as f32;
            let fy = (y - y0f) as f32;
            let x0 = x0f.clamp(0.0, width as f64 - 1.0) as u32;
            let y0 = y0f.clamp(0.0, height as f64 - 1.0) as u32;
            let x1 = (x0 + 1).min(width - 1);
            let y1 = (y0 + 1).min(height - 1);

            let v00 = source.fetch(image_index, x0, y0)?;
            let v10 = source.fetch(image_index, x1, y0)?;
            let v01 = source.fetch(image_index, x0, y1)?;
            let v11 = source.fetch(image_index, x1, y1)?;

            let mut out = [0.0f32; 4];
            for ch in 0..4 {
                let top = v00[ch] * (1.0 - fx) + v10[ch] * fx;
                let bottom = v01[ch] * (1.0 - fx) + v11[ch] * fx;
                out[ch] = top * (1.0 - fy) + bottom * fy;
            }
            Some(out)
        }
    }
}

/// Remap one source image into canvas space.
///
/// Returns `Ok(None)` when the image touches no canvas pixel at all.
/// Per-pixel mapping failures (outside the source, behind the projection,
/// non-converged distortion inversion) contribute zero weight and are not
/// errors.
pub fn remap_image(
    image_index: usize,
    geometry: &SourceImageGeometry,
    mapper: &ImageMapper,
    canvas: &CanvasOptions,
    config: &RemapConfig,
    source: &dyn PixelSource,
) -> Result<Option<RemappedRegion>> {
    let (sw, sh) = source.dimensions(image_index).ok_or_else(|| {
        StitchError::PixelSource(format!("no pixel data for image {image_index}"))
    })?;
    if (sw, sh) != (geometry.width, geometry.height) {
        return Err(StitchError::PixelSource(format!(
            "image {image_index}: pixel data is {sw}x{sh}, geometry says {}x{}",
            geometry.width, geometry.height
        )));
    }

    let rect = estimate_roi(mapper, geometry, canvas);
    if rect.is_empty() {
        return Ok(None);
    }

    let to_scene = PhotometricTransform::new(&geometry.photometric);
    let to_output = PhotometricTransform::for_output(canvas.exposure_ev);
    // Vignetting radius is normalized so the source corner sits at 1.
    let half_diag = ((geometry.width as f64).powi(2) + (geometry.height as f64).powi(2)).sqrt() * 0.5;
    let (cx, cy) = (geometry.width as f64 * 0.5, geometry.height as f64 * 0.5);
    let feather = config.feather_px.max(0.0);

    let w = rect.width as usize;
    let h = rect.height as usize;
    let mut rgb = vec![[0.0f32; 3]; w * h];
    let mut weight = vec![0.0f32; w * h];

    rgb.par_chunks_mut(w)
        .zip(weight.par_chunks_mut(w))
        .enumerate()
        .for_each(|(row, (rgb_row, weight_row))| {
            let canvas_y = rect.y as f64 + row as f64;
            for col in 0..w {
                let canvas_x = rect.x as f64 + col as f64;
                let Some([sx, sy]) = mapper.canvas_to_source([canvas_x, canvas_y]) else {
                    continue;
                };
                let Some(px) = sample(
                    source,
                    image_index,
                    geometry.width,
                    geometry.height,
                    sx,
                    sy,
                    config.interpolation,
                ) else {
                    continue;
                };

                let dist = mapper.boundary_distance([sx, sy]);
                if dist <= 0.0 {
                    continue;
                }
                let mut wgt = if feather > 0.0 {
                    (dist / feather).min(1.0) as f32
                } else {
                    1.0
                };
                wgt *= px[3];
                if wgt <= 0.0 {
                    continue;
                }

                let r_norm = ((sx - cx).powi(2) + (sy - cy).powi(2)).sqrt() / half_diag;
                let scene = to_scene.to_scene([px[0], px[1], px[2]], r_norm);
                rgb_row[col] = to_output.to_camera(scene, 0.0);
                weight_row[col] = wgt;
            }
        });

    Ok(tighten(RemappedRegion {
        image_index,
        rect,
        rgb,
        weight,
    }))
}

/// Shrink a region to the bounding box of its nonzero weights.
fn tighten(region: RemappedRegion) -> Option<RemappedRegion> {
    let w = region.rect.width;
    let h = region.rect.height;
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut any = false;
    for y in 0..h {
        for x in 0..w {
            if region.weight[region.index(x, y)] > 0.0 {
                any = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }
    if !any {
        return None;
    }
    if min_x == 0 && min_y == 0 && max_x == w - 1 && max_y == h - 1 {
        return Some(region);
    }

    let nw = max_x - min_x + 1;
    let nh = max_y - min_y + 1;
    let mut rgb = Vec::with_capacity(nw as usize * nh as usize);
    let mut weight = Vec::with_capacity(nw as usize * nh as usize);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let i = region.index(x, y);
            rgb.push(region.rgb[i]);
            weight.push(region.weight[i]);
        }
    }
    Some(RemappedRegion {
        image_index: region.image_index,
        rect: CanvasRect::new(
            region.rect.x + min_x,
            region.rect.y + min_y,
            nw,
            nh,
        ),
        rgb,
        weight,
    })
}

//! Per-image coordinate mapping between source pixels and canvas pixels.

use nalgebra::{Matrix3, Vector2};

use crate::canvas::CanvasOptions;
use crate::error::{Result, StitchError};
use crate::geometry::{InversionConfig, Projection, RadialPolynomial};
use crate::source::{SourceCrop, SourceImageGeometry};

/// Two-way mapping between a source image's pixel frame and the canvas
/// pixel frame. Both directions return `None` for points with no valid
/// mapping rather than producing out-of-domain coordinates.
///
/// Implemented by [`ImageMapper`]; the trait exists so tests and tooling
/// can substitute synthetic mappings.
pub trait PanoMapper {
    /// Source pixel to canvas pixel.
    fn source_to_canvas(&self, source_xy: [f64; 2]) -> Option<[f64; 2]>;
    /// Canvas pixel to source pixel. Used by the remap hot loop.
    fn canvas_to_source(&self, canvas_xy: [f64; 2]) -> Option<[f64; 2]>;
}

/// Concrete mapper built from one [`SourceImageGeometry`] and the
/// [`CanvasOptions`].
#[derive(Debug, Clone)]
pub struct ImageMapper {
    src_proj: Projection,
    src_scale: f64,
    src_cx: f64,
    src_cy: f64,
    crop: SourceCrop,
    /// Radius of the valid circle for circular fisheyes, in pixels.
    circle_radius: Option<f64>,
    distortion: RadialPolynomial,
    inversion: InversionConfig,
    /// Half the smaller source dimension; normalizes distortion radii.
    radius_norm: f64,
    cam_to_world: Matrix3<f64>,
    world_to_cam: Matrix3<f64>,
    canvas_proj: Projection,
    canvas_scale: f64,
    canvas_cx: f64,
    canvas_cy: f64,
}

impl ImageMapper {
    pub fn new(geometry: &SourceImageGeometry, canvas: &CanvasOptions) -> Result<Self> {
        if geometry.width == 0 || geometry.height == 0 {
            return Err(StitchError::Config(format!(
                "source dimensions {}x{} must be positive",
                geometry.width, geometry.height
            )));
        }
        if !(geometry.hfov_deg > 0.0) || geometry.hfov_deg > 360.0 {
            return Err(StitchError::Config(format!(
                "source hfov {} out of range (0, 360]",
                geometry.hfov_deg
            )));
        }
        if geometry.projection == Projection::Rectilinear && geometry.hfov_deg >= 180.0 {
            return Err(StitchError::Config(
                "rectilinear source hfov must be below 180 degrees".into(),
            ));
        }

        let w = geometry.width as f64;
        let h = geometry.height as f64;
        let crop = geometry.effective_crop();
        if crop.width() == 0 || crop.height() == 0 {
            return Err(StitchError::Config("source crop is empty".into()));
        }

        let circle_radius = match geometry.projection {
            Projection::FisheyeCircular => Some(crop.width().min(crop.height()) as f64 * 0.5),
            _ => None,
        };

        let cam_to_world = geometry.orientation.to_matrix();
        Ok(Self {
            src_proj: geometry.projection,
            src_scale: geometry
                .projection
                .pixels_per_unit(geometry.width, geometry.hfov_deg),
            src_cx: w * 0.5,
            src_cy: h * 0.5,
            crop,
            circle_radius,
            distortion: geometry.distortion,
            inversion: InversionConfig::default(),
            radius_norm: w.min(h) * 0.5,
            cam_to_world,
            world_to_cam: cam_to_world.transpose(),
            canvas_proj: canvas.projection,
            canvas_scale: canvas
                .projection
                .pixels_per_unit(canvas.width, canvas.hfov_deg),
            canvas_cx: canvas.width as f64 * 0.5,
            canvas_cy: canvas.height as f64 * 0.5,
        })
    }

    /// Center of the crop area (circular fisheyes mask around this point).
    fn crop_center(&self) -> (f64, f64) {
        (
            (self.crop.left + self.crop.right) as f64 * 0.5,
            (self.crop.top + self.crop.bottom) as f64 * 0.5,
        )
    }

    /// True when the source pixel lies in the valid (crop + circle) area.
    pub fn source_valid(&self, source_xy: [f64; 2]) -> bool {
        if !self.crop.contains(source_xy[0], source_xy[1]) {
            return false;
        }
        if let Some(radius) = self.circle_radius {
            let (ccx, ccy) = self.crop_center();
            let dx = source_xy[0] - ccx;
            let dy = source_xy[1] - ccy;
            if dx * dx + dy * dy > radius * radius {
                return false;
            }
        }
        true
    }

    /// Distance (pixels) from the source point to the valid-area boundary;
    /// negative outside. Drives the feather ramp.
    pub fn boundary_distance(&self, source_xy: [f64; 2]) -> f64 {
        let [x, y] = source_xy;
        let mut d = (x - self.crop.left as f64)
            .min(self.crop.right as f64 - x)
            .min(y - self.crop.top as f64)
            .min(self.crop.bottom as f64 - y);
        if let Some(radius) = self.circle_radius {
            let (ccx, ccy) = self.crop_center();
            let r = ((x - ccx).powi(2) + (y - ccy).powi(2)).sqrt();
            d = d.min(radius - r);
        }
        d
    }
}

impl PanoMapper for ImageMapper {
    fn source_to_canvas(&self, source_xy: [f64; 2]) -> Option<[f64; 2]> {
        let dx = source_xy[0] - self.src_cx;
        let dy = source_xy[1] - self.src_cy;

        // Undo lens distortion: recorded radius -> ideal radius.
        let (dx, dy) = if self.distortion.is_identity() {
            (dx, dy)
        } else {
            let r_dist = (dx * dx + dy * dy).sqrt() / self.radius_norm;
            if r_dist < 1e-12 {
                (dx, dy)
            } else {
                let r_ideal = self.distortion.undistort(r_dist, &self.inversion)?;
                let f = r_ideal / r_dist;
                (dx * f, dy * f)
            }
        };

        let plane = Vector2::new(dx / self.src_scale, dy / self.src_scale);
        let dir_cam = self.src_proj.unproject(plane)?;
        let dir_world = self.cam_to_world * dir_cam;
        let out = self.canvas_proj.project(dir_world)?;
        Some([
            out.x * self.canvas_scale + self.canvas_cx,
            out.y * self.canvas_scale + self.canvas_cy,
        ])
    }

    fn canvas_to_source(&self, canvas_xy: [f64; 2]) -> Option<[f64; 2]> {
        let plane = Vector2::new(
            (canvas_xy[0] - self.canvas_cx) / self.canvas_scale,
            (canvas_xy[1] - self.canvas_cy) / self.canvas_scale,
        );
        let dir_world = self.canvas_proj.unproject(plane)?;
        let dir_cam = self.world_to_cam * dir_world;
        let p = self.src_proj.project(dir_cam)?;

        let mut dx = p.x * self.src_scale;
        let mut dy = p.y * self.src_scale;

        // Apply lens distortion: ideal radius -> recorded radius.
        if !self.distortion.is_identity() {
            let r_ideal = (dx * dx + dy * dy).sqrt() / self.radius_norm;
            let f = if r_ideal < 1e-12 {
                self.distortion.linear_term()
            } else {
                self.distortion.scale_at(r_ideal)
            };
            if !f.is_finite() || f <= 0.0 {
                return None;
            }
            dx *= f;
            dy *= f;
        }

        let src = [dx + self.src_cx, dy + self.src_cy];
        if self.source_valid(src) {
            Some(src)
        } else {
            None
        }
    }
}

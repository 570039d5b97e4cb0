//! Projection models mapping view directions to plane coordinates.
//!
//! Plane coordinates are dimensionless (tangent units for rectilinear,
//! radians for the angle-based projections). The conversion to pixels is a
//! single scale factor owned by [`crate::geometry::ImageMapper`].
//!
//! Conventions: the camera looks along +Z, x points right, y points down.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Supported projection kinds for sources and for the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Pinhole / gnomonic projection.
    Rectilinear,
    /// Cylindrical: longitude on x, tangent of latitude on y.
    Cylindrical,
    /// Equirectangular: longitude on x, latitude on y.
    Equirectangular,
    /// Equidistant fisheye covering the full image rectangle.
    FisheyeFullFrame,
    /// Equidistant fisheye with a circular valid area inscribed in the frame.
    FisheyeCircular,
}

const EPS: f64 = 1e-12;

impl Projection {
    /// Project a view direction to plane coordinates.
    ///
    /// Returns `None` when the direction is not representable in this
    /// projection (e.g. behind the camera for rectilinear). The input does
    /// not need to be normalized.
    pub fn project(self, dir: Vector3<f64>) -> Option<Vector2<f64>> {
        match self {
            Projection::Rectilinear => {
                if dir.z <= EPS {
                    return None;
                }
                Some(Vector2::new(dir.x / dir.z, dir.y / dir.z))
            }
            Projection::Cylindrical => {
                let hyp = (dir.x * dir.x + dir.z * dir.z).sqrt();
                if hyp <= EPS {
                    return None;
                }
                Some(Vector2::new(dir.x.atan2(dir.z), dir.y / hyp))
            }
            Projection::Equirectangular => {
                let n = dir.norm();
                if n <= EPS {
                    return None;
                }
                let lat = (dir.y / n).clamp(-1.0, 1.0).asin();
                Some(Vector2::new(dir.x.atan2(dir.z), lat))
            }
            Projection::FisheyeFullFrame | Projection::FisheyeCircular => {
                let n = dir.norm();
                if n <= EPS {
                    return None;
                }
                let theta = (dir.z / n).clamp(-1.0, 1.0).acos();
                let rxy = (dir.x * dir.x + dir.y * dir.y).sqrt();
                if rxy <= EPS {
                    // On-axis: forward maps to the center, backward has no
                    // defined azimuth.
                    if theta < std::f64::consts::FRAC_PI_2 {
                        return Some(Vector2::new(0.0, 0.0));
                    }
                    return None;
                }
                Some(Vector2::new(theta * dir.x / rxy, theta * dir.y / rxy))
            }
        }
    }

    /// Unproject plane coordinates to a view direction.
    ///
    /// Returns `None` when the plane point lies outside the projection's
    /// valid domain (e.g. latitude beyond the poles, fisheye radius > pi).
    pub fn unproject(self, p: Vector2<f64>) -> Option<Vector3<f64>> {
        match self {
            Projection::Rectilinear => Some(Vector3::new(p.x, p.y, 1.0)),
            Projection::Cylindrical => {
                if p.x.abs() > std::f64::consts::PI {
                    return None;
                }
                Some(Vector3::new(p.x.sin(), p.y, p.x.cos()))
            }
            Projection::Equirectangular => {
                if p.x.abs() > std::f64::consts::PI
                    || p.y.abs() > std::f64::consts::FRAC_PI_2
                {
                    return None;
                }
                let (sin_lat, cos_lat) = p.y.sin_cos();
                let (sin_lon, cos_lon) = p.x.sin_cos();
                Some(Vector3::new(cos_lat * sin_lon, sin_lat, cos_lat * cos_lon))
            }
            Projection::FisheyeFullFrame | Projection::FisheyeCircular => {
                let r = (p.x * p.x + p.y * p.y).sqrt();
                if r > std::f64::consts::PI {
                    return None;
                }
                if r <= EPS {
                    return Some(Vector3::new(0.0, 0.0, 1.0));
                }
                let (sin_t, cos_t) = r.sin_cos();
                Some(Vector3::new(sin_t * p.x / r, sin_t * p.y / r, cos_t))
            }
        }
    }

    /// Pixels per plane unit for an image of `width` pixels spanning
    /// `hfov_deg` degrees horizontally.
    pub fn pixels_per_unit(self, width: u32, hfov_deg: f64) -> f64 {
        let half_fov = hfov_deg.to_radians() * 0.5;
        let half_w = width as f64 * 0.5;
        match self {
            Projection::Rectilinear => half_w / half_fov.tan(),
            _ => half_w / half_fov,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(proj: Projection, p: Vector2<f64>) {
        let dir = proj.unproject(p).expect("unproject");
        let q = proj.project(dir).expect("project");
        assert!(
            (q - p).norm() < 1e-9,
            "{proj:?}: {p:?} -> {dir:?} -> {q:?}"
        );
    }

    #[test]
    fn rectilinear_roundtrip() {
        roundtrip(Projection::Rectilinear, Vector2::new(0.3, -0.7));
        roundtrip(Projection::Rectilinear, Vector2::new(0.0, 0.0));
    }

    #[test]
    fn rectilinear_rejects_behind_camera() {
        assert!(Projection::Rectilinear
            .project(Vector3::new(0.1, 0.0, -1.0))
            .is_none());
    }

    #[test]
    fn cylindrical_roundtrip() {
        roundtrip(Projection::Cylindrical, Vector2::new(1.2, 0.4));
        roundtrip(Projection::Cylindrical, Vector2::new(-2.8, -1.3));
    }

    #[test]
    fn equirectangular_roundtrip() {
        roundtrip(Projection::Equirectangular, Vector2::new(2.0, 1.1));
        roundtrip(Projection::Equirectangular, Vector2::new(-0.5, -0.2));
    }

    #[test]
    fn equirectangular_rejects_out_of_domain() {
        assert!(Projection::Equirectangular
            .unproject(Vector2::new(0.0, 2.0))
            .is_none());
    }

    #[test]
    fn fisheye_roundtrip() {
        roundtrip(Projection::FisheyeFullFrame, Vector2::new(0.9, -1.4));
        roundtrip(Projection::FisheyeCircular, Vector2::new(0.0, 0.0));
        // Past 90 degrees off-axis, still representable.
        roundtrip(Projection::FisheyeCircular, Vector2::new(2.0, 1.0));
    }

    #[test]
    fn fisheye_on_axis_behind_is_invalid() {
        assert!(Projection::FisheyeFullFrame
            .project(Vector3::new(0.0, 0.0, -1.0))
            .is_none());
    }

    #[test]
    fn pixels_per_unit_rectilinear_matches_tangent() {
        let s = Projection::Rectilinear.pixels_per_unit(100, 90.0);
        assert!((s - 50.0).abs() < 1e-9);
    }

    #[test]
    fn pixels_per_unit_angular_is_linear_in_fov() {
        let s = Projection::Equirectangular.pixels_per_unit(360, 360.0);
        assert!((s - 180.0 / std::f64::consts::PI).abs() < 1e-9);
    }
}

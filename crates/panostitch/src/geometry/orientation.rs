//! Per-image orientation as yaw/pitch/roll angles.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Camera orientation in degrees.
///
/// Rotation order (camera to panorama frame): roll about the view axis,
/// then pitch about the horizontal axis, then yaw about the vertical axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Rotation about the vertical axis, positive turns the view right.
    pub yaw_deg: f64,
    /// Rotation about the horizontal axis, positive tilts the view up.
    pub pitch_deg: f64,
    /// Rotation about the view axis, positive rolls clockwise.
    pub roll_deg: f64,
}

impl Orientation {
    pub fn new(yaw_deg: f64, pitch_deg: f64, roll_deg: f64) -> Self {
        Self {
            yaw_deg,
            pitch_deg,
            roll_deg,
        }
    }

    /// Rotation matrix taking camera-frame directions to panorama-frame
    /// directions. Axes: x right, y down, z forward.
    pub fn to_matrix(&self) -> Matrix3<f64> {
        let (sy, cy) = self.yaw_deg.to_radians().sin_cos();
        let (sp, cp) = self.pitch_deg.to_radians().sin_cos();
        let (sr, cr) = self.roll_deg.to_radians().sin_cos();

        // Yaw about y (positive: view moves toward +x).
        let yaw = Matrix3::new(
            cy, 0.0, sy, //
            0.0, 1.0, 0.0, //
            -sy, 0.0, cy,
        );
        // Pitch about x (positive: view moves toward -y, i.e. up).
        let pitch = Matrix3::new(
            1.0, 0.0, 0.0, //
            0.0, cp, -sp, //
            0.0, sp, cp,
        );
        // Roll about z.
        let roll = Matrix3::new(
            cr, -sr, 0.0, //
            sr, cr, 0.0, //
            0.0, 0.0, 1.0,
        );
        yaw * pitch * roll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn identity_orientation_is_identity_matrix() {
        let m = Orientation::default().to_matrix();
        assert!((m - Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn yaw_90_turns_forward_to_right() {
        let m = Orientation::new(90.0, 0.0, 0.0).to_matrix();
        let v = m * Vector3::new(0.0, 0.0, 1.0);
        assert!((v - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn pitch_90_turns_forward_up() {
        let m = Orientation::new(0.0, 90.0, 0.0).to_matrix();
        let v = m * Vector3::new(0.0, 0.0, 1.0);
        // y points down, so "up" is -y.
        assert!((v - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn matrices_are_orthonormal() {
        let m = Orientation::new(31.0, -12.0, 47.0).to_matrix();
        let should_be_identity = m * m.transpose();
        assert!((should_be_identity - Matrix3::identity()).norm() < 1e-9);
    }
}

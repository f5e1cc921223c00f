//! Local node transforms.
//!
//! A [`Transform`] is the translation/rotation/scale triple stored on every
//! scene node. World matrices are obtained by multiplying the matrices of all
//! ancestors, see [`crate::data_structures::scene_graph::SceneNode`].

use cgmath::{One, Rotation3};

/// Translation, rotation (as quaternion), and scale of a node relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Transform {
    /// Identity transform (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Builds a transform from a glTF style decomposition where the rotation is `[x, y, z, w]`.
    pub fn from_decomposed(position: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        let [x, y, z, w] = rotation;
        Self {
            position: position.into(),
            rotation: cgmath::Quaternion::new(w, x, y, z),
            scale: scale.into(),
        }
    }

    /// Rotate by `angle` about the X axis on top of the current rotation.
    pub fn rotate_x(&mut self, angle: cgmath::Deg<f32>) {
        self.rotation = cgmath::Quaternion::from_angle_x(angle) * self.rotation;
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Transform as _;

    use super::*;

    #[test]
    fn identity_matrix_leaves_points_alone() {
        let m = Transform::new().to_matrix();
        let p = m.transform_point(cgmath::Point3::new(1.0, 2.0, 3.0));
        assert_eq!(p, cgmath::Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn half_turn_about_x_flips_y_and_z() {
        let mut t = Transform::new();
        t.rotate_x(cgmath::Deg(180.0));
        let p = t.to_matrix().transform_point(cgmath::Point3::new(1.0, 2.0, 3.0));
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!((p.y + 2.0).abs() < 1e-5);
        assert!((p.z + 3.0).abs() < 1e-5);
    }
}

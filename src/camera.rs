//! Automatic framing: a perspective camera that looks at the whole model.
//!
//! The camera sits on the +Z side of the bounding box centre, far enough back
//! that the largest box dimension fits the vertical field of view, times the
//! configured padding. Framing is a pure function of the bounds, the output
//! size and the config.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3, Vector4};

use crate::{config::RenderConfig, data_structures::geometry::Aabb};

/// cgmath produces OpenGL clip space (z in -1..1); WGPU expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::from_cols(
    Vector4::new(1.0, 0.0, 0.0, 0.0),
    Vector4::new(0.0, 1.0, 0.0, 0.0),
    Vector4::new(0.0, 0.0, 0.5, 0.0),
    Vector4::new(0.0, 0.0, 0.5, 1.0),
);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub fov_y: cgmath::Deg<f32>,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, up_for(self.target - self.position))
    }

    pub fn projection(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection() * self.view()
    }
}

/// +Y, unless the view direction is (nearly) vertical.
pub fn up_for(direction: Vector3<f32>) -> Vector3<f32> {
    let dir = direction.normalize();
    if dir.dot(Vector3::unit_y()).abs() > 0.999 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    }
}

/// Distance from the box centre at which a box of `max_dimension` fills the view.
pub fn framing_distance(max_dimension: f32, config: &RenderConfig) -> f32 {
    let half_fov: cgmath::Rad<f32> = (config.fov_y / 2.0).into();
    let distance = (max_dimension / 2.0) / half_fov.0.tan() * config.padding;
    if max_dimension > 0.0 && distance.is_finite() {
        distance
    } else {
        config.fallback_distance
    }
}

/// Places the camera for an image of `width` x `height` showing `bounds`.
pub fn frame_scene(bounds: &Aabb, width: u32, height: u32, config: &RenderConfig) -> Camera {
    let center = bounds.center();
    let max_dimension = bounds.max_dimension();
    let distance = framing_distance(max_dimension, config);
    let reach = if max_dimension.is_finite() {
        distance + max_dimension * 2.0
    } else {
        distance
    };
    let radius = bounds.radius();
    // Pull the near plane in for models smaller than it.
    let near = if radius.is_finite() {
        config.near.min((distance - radius) * 0.5).max(distance * 1e-3)
    } else {
        config.near
    };

    let camera = Camera {
        position: Point3::new(center.x, center.y, center.z + distance),
        target: center,
        fov_y: config.fov_y,
        aspect: width as f32 / height.max(1) as f32,
        near,
        far: config.far.max(reach),
    };
    log::debug!(
        "framed {:?} at distance {:.3} (near {:.4}, far {:.1})",
        bounds,
        distance,
        camera.near,
        camera.far
    );
    camera
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_cube_is_framed_from_plus_z() {
        let bounds = Aabb::from_points([-0.5, -0.5, -0.5], [0.5, 0.5, 0.5]);
        let camera = frame_scene(&bounds, 800, 600, &RenderConfig::default());

        assert!((camera.position.z - 1.8107).abs() < 1e-3);
        assert_eq!(camera.position.x, 0.0);
        assert_eq!(camera.position.y, 0.0);
        assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 1000.0);
    }

    #[test]
    fn distance_is_measured_from_the_box_centre() {
        let bounds = Aabb::from_points([9.0, 0.0, -2.0], [11.0, 4.0, 2.0]);
        let camera = frame_scene(&bounds, 100, 100, &RenderConfig::default());
        let expected = 2.0 / (22.5f32).to_radians().tan() * 1.5;

        assert_eq!(camera.target, Point3::new(10.0, 2.0, 0.0));
        assert!((camera.position.z - expected).abs() < 1e-4);
    }

    #[test]
    fn degenerate_bounds_use_the_fallback_distance() {
        let point = Aabb::from_points([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]);
        let camera = frame_scene(&point, 64, 64, &RenderConfig::default());
        assert_eq!(camera.position, Point3::new(1.0, 1.0, 6.0));

        let empty = frame_scene(&Aabb::empty(), 64, 64, &RenderConfig::default());
        assert_eq!(empty.position, Point3::new(0.0, 0.0, 5.0));
        assert!(empty.view_projection().x.x.is_finite());
    }

    #[test]
    fn far_plane_grows_with_huge_models() {
        let bounds = Aabb::from_points([-1000.0; 3], [1000.0; 3]);
        let camera = frame_scene(&bounds, 64, 64, &RenderConfig::default());
        assert!(camera.far > camera.position.z + 1000.0);
    }

    #[test]
    fn near_plane_shrinks_with_tiny_models() {
        let bounds = Aabb::from_points([-0.005; 3], [0.005; 3]);
        let camera = frame_scene(&bounds, 400, 300, &RenderConfig::default());

        assert!(camera.position.z < 0.1);
        assert!(camera.near > 0.0);
        assert!(camera.near < camera.position.z - bounds.radius());

        // Every corner of the box lands inside the depth range.
        for corner in [[-0.005f32; 3], [0.005; 3]] {
            let clip = camera.view_projection() * Vector4::new(corner[0], corner[1], corner[2], 1.0);
            let depth = clip.z / clip.w;
            assert!(depth > 0.0 && depth < 1.0, "depth {}", depth);
        }
    }

    #[test]
    fn framing_is_deterministic() {
        let bounds = Aabb::from_points([-3.0, 0.0, 1.0], [2.0, 7.5, 4.0]);
        let config = RenderConfig::default();
        assert_eq!(
            frame_scene(&bounds, 320, 240, &config),
            frame_scene(&bounds, 320, 240, &config)
        );
    }

    #[test]
    fn centre_projects_to_the_middle_of_clip_space() {
        let bounds = Aabb::from_points([-0.5; 3], [0.5; 3]);
        let camera = frame_scene(&bounds, 400, 300, &RenderConfig::default());
        let clip = camera.view_projection() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}

//! Uniform blocks of the scene shader.

use cgmath::{InnerSpace, Matrix4, Vector3};

use crate::{
    camera::Camera,
    data_structures::{light::Light, material::Material},
};

/// Layer of the shadow map array used by each shadow casting light.
pub const DIRECTIONAL_SHADOW_LAYER: u32 = 0;
pub const POINT_SHADOW_LAYER: u32 = 1;
pub const SHADOW_LAYERS: u32 = 2;

/// Depth offset subtracted before the shadow comparison, in NDC depth units.
pub const SHADOW_BIAS: f32 = 0.0005;

/// Mirrors `Globals` in `scene.wgsl`. Every member is 16 byte aligned.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalsUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    /// Summed ambient radiance.
    pub ambient: [f32; 4],
    /// Unit vector toward the directional light, `w` = 1 if it casts shadows.
    pub dir_light_dir: [f32; 4],
    pub dir_light_color: [f32; 4],
    /// `w` = 1 if the point light casts shadows.
    pub point_light_pos: [f32; 4],
    pub point_light_color: [f32; 4],
    pub light_view_proj: [[[f32; 4]; 4]; SHADOW_LAYERS as usize],
    /// x: shadow map texel size, y: comparison bias.
    pub shadow_params: [f32; 4],
}

impl GlobalsUniform {
    /// Fills the block from the camera and the lights. Only the first
    /// directional and the first point light are used; ambient lights add up.
    pub fn new(
        camera: &Camera,
        lights: &[Light],
        light_view_proj: [Matrix4<f32>; SHADOW_LAYERS as usize],
        shadow_map_size: u32,
    ) -> Self {
        let mut uniform = Self {
            view_proj: camera.view_projection().into(),
            camera_pos: camera.position.to_homogeneous().into(),
            ambient: [0.0; 4],
            dir_light_dir: [0.0, 1.0, 0.0, 0.0],
            dir_light_color: [0.0; 4],
            point_light_pos: [0.0; 4],
            point_light_color: [0.0; 4],
            light_view_proj: light_view_proj.map(Into::into),
            shadow_params: [1.0 / shadow_map_size.max(1) as f32, SHADOW_BIAS, 0.0, 0.0],
        };
        let mut seen_directional = false;
        let mut seen_point = false;
        for light in lights {
            let radiance = light.radiance();
            match *light {
                Light::Ambient { .. } => {
                    for (sum, r) in uniform.ambient.iter_mut().zip(radiance) {
                        *sum += r;
                    }
                }
                Light::Directional {
                    position,
                    cast_shadow,
                    ..
                } if !seen_directional => {
                    seen_directional = true;
                    let dir = Vector3::from(position);
                    let dir = if dir.magnitude2() > 0.0 {
                        dir.normalize()
                    } else {
                        Vector3::unit_y()
                    };
                    uniform.dir_light_dir = dir.extend(flag(cast_shadow)).into();
                    uniform.dir_light_color = extend(radiance);
                }
                Light::Point {
                    position,
                    cast_shadow,
                    ..
                } if !seen_point => {
                    seen_point = true;
                    uniform.point_light_pos = Vector3::from(position).extend(flag(cast_shadow)).into();
                    uniform.point_light_color = extend(radiance);
                }
                _ => log::warn!("only one directional and one point light are shaded, ignoring {:?}", light),
            }
        }
        uniform
    }
}

/// Mirrors `Material` in `scene.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    /// x: metalness, y: roughness, z: has texture, w: receives shadows.
    pub params: [f32; 4],
}

impl MaterialUniform {
    pub fn new(material: &Material, receive_shadow: bool) -> Self {
        Self {
            base_color: material.base_color,
            params: [
                material.metalness,
                material.roughness,
                flag(material.texture.is_some()),
                flag(receive_shadow),
            ],
        }
    }
}

fn flag(on: bool) -> f32 {
    if on { 1.0 } else { 0.0 }
}

fn extend(rgb: [f32; 3]) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], 1.0]
}

#[cfg(test)]
mod tests {
    use cgmath::{Point3, SquareMatrix};

    use super::*;
    use crate::scene::{AMBIENT_LIGHT, FILL_LIGHT, KEY_LIGHT};

    fn camera() -> Camera {
        Camera {
            position: Point3::new(0.0, 0.0, 3.0),
            target: Point3::new(0.0, 0.0, 0.0),
            fov_y: cgmath::Deg(45.0),
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }

    #[test]
    fn uniform_sizes_match_the_shader() {
        assert_eq!(std::mem::size_of::<GlobalsUniform>(), 304);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 32);
    }

    #[test]
    fn rig_is_packed_into_globals() {
        let identity = Matrix4::identity();
        let globals = GlobalsUniform::new(
            &camera(),
            &[AMBIENT_LIGHT, KEY_LIGHT, FILL_LIGHT],
            [identity, identity],
            2048,
        );
        assert_eq!(globals.ambient, [0.8, 0.8, 0.8, 0.0]);
        assert_eq!(globals.dir_light_color, [1.5, 1.5, 1.5, 1.0]);
        assert_eq!(globals.dir_light_dir[3], 1.0);
        let len = globals.dir_light_dir[..3].iter().map(|c| c * c).sum::<f32>().sqrt();
        assert!((len - 1.0).abs() < 1e-5);
        assert_eq!(globals.point_light_pos, [10.0, 10.0, 10.0, 1.0]);
        assert_eq!(globals.camera_pos, [0.0, 0.0, 3.0, 1.0]);
        assert_eq!(globals.shadow_params[0], 1.0 / 2048.0);
    }

    #[test]
    fn material_flags() {
        let m = MaterialUniform::new(&Material::mesh_default(), true);
        assert_eq!(m.params, [0.3, 0.7, 0.0, 1.0]);
    }
}

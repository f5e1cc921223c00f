//! Shadow mapping.
//!
//! Each shadow casting light renders the scene depth into its own layer of a
//! square `Depth32Float` array texture. The light's projection is fitted to
//! the bounding sphere of the scene so the whole model lands in the map. The
//! scene shader filters lookups with 3x3 PCF.

use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::{OPENGL_TO_WGPU_MATRIX, up_for},
    data_structures::{
        geometry::Aabb,
        light::Light,
        model::{ModelVertex, Vertex},
        texture::GpuTexture,
    },
    pipelines::{
        light::{DIRECTIONAL_SHADOW_LAYER, POINT_SHADOW_LAYER, SHADOW_LAYERS},
        mk_render_pipeline,
    },
};

/// Vertex-only group 0 of the shadow pass: the light's view-projection.
pub fn mk_light_space_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_space_bind_group_layout"),
    })
}

pub fn mk_shadow_pipeline(
    device: &wgpu::Device,
    light_space_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[light_space_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "Shadow Pipeline",
        &layout,
        None,
        Some(GpuTexture::DEPTH_FORMAT),
        wgpu::DepthBiasState {
            constant: 2,
            slope_scale: 2.0,
            clamp: 0.0,
        },
        1,
        &[ModelVertex::desc()],
        shader,
    )
}

/// View-projection of the directional light, an orthographic box around the scene.
///
/// The light shines from `position` toward the world origin, so only the
/// direction of `position` matters.
pub fn directional_view_proj(position: [f32; 3], bounds: &Aabb) -> Matrix4<f32> {
    let (center, radius) = sphere(bounds);
    let dir = Vector3::from(position);
    let dir = if dir.magnitude2() > 0.0 {
        dir.normalize()
    } else {
        Vector3::unit_y()
    };
    let eye = center + dir * (radius * 2.0);
    let view = Matrix4::look_at_rh(eye, center, up_for(-dir));
    let proj = cgmath::ortho(-radius, radius, -radius, radius, radius * 0.5, radius * 3.5);
    OPENGL_TO_WGPU_MATRIX * proj * view
}

/// View-projection of the point light, a perspective frustum aimed at the scene centre.
pub fn point_view_proj(position: [f32; 3], bounds: &Aabb) -> Matrix4<f32> {
    let (center, radius) = sphere(bounds);
    let eye = Point3::from(position);
    let to_center = center - eye;
    let distance = to_center.magnitude();

    let (fov, near) = if distance > radius * 1.001 {
        let half = (radius / distance).asin() * 1.1;
        (cgmath::Rad(half * 2.0), ((distance - radius) * 0.9).max(radius * 0.01))
    } else {
        // Light inside the bounds: cover a wide cone in front of it.
        (cgmath::Deg(120.0).into(), radius * 0.01)
    };
    let fov = cgmath::Rad(fov.0.min(170f32.to_radians()));
    let direction = if distance > 0.0 {
        to_center / distance
    } else {
        -Vector3::unit_y()
    };
    let view = Matrix4::look_at_rh(eye, eye + direction, up_for(direction));
    let proj = cgmath::perspective(fov, 1.0, near, (distance + radius) * 1.1);
    OPENGL_TO_WGPU_MATRIX * proj * view
}

/// Bounding sphere of `bounds`; a unit sphere at the origin for empty scenes.
fn sphere(bounds: &Aabb) -> (Point3<f32>, f32) {
    let radius = bounds.radius();
    if bounds.is_empty() || !(radius > 1e-4) || !radius.is_finite() {
        (bounds.center(), 1.0)
    } else {
        (bounds.center(), radius)
    }
}

/// The light space matrices for every shadow layer, identity for layers whose light is absent.
pub fn light_view_projections(
    lights: &[Light],
    bounds: &Aabb,
) -> [Matrix4<f32>; SHADOW_LAYERS as usize] {
    let mut out = [Matrix4::identity(); SHADOW_LAYERS as usize];
    let directional = lights.iter().find_map(|l| match l {
        Light::Directional { position, .. } => Some(*position),
        _ => None,
    });
    let point = lights.iter().find_map(|l| match l {
        Light::Point { position, .. } => Some(*position),
        _ => None,
    });
    if let Some(position) = directional {
        out[DIRECTIONAL_SHADOW_LAYER as usize] = directional_view_proj(position, bounds);
    }
    if let Some(position) = point {
        out[POINT_SHADOW_LAYER as usize] = point_view_proj(position, bounds);
    }
    out
}

/// The shadow map array plus per-layer render views and light uniforms.
pub struct ShadowMaps {
    pub texture: wgpu::Texture,
    /// Whole array, bound in the scene pass.
    pub array_view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    /// One per layer, rendered to in the shadow pass.
    pub layers: Vec<ShadowLayer>,
}

pub struct ShadowLayer {
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
    /// Lights that do not cast shadows leave their layer cleared to the far plane.
    pub enabled: bool,
}

impl ShadowMaps {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        size: u32,
        view_projections: &[Matrix4<f32>; SHADOW_LAYERS as usize],
        enabled: [bool; SHADOW_LAYERS as usize],
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: SHADOW_LAYERS,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: GpuTexture::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadow_map array view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let layers = (0..SHADOW_LAYERS)
            .map(|layer| {
                let view = texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&format!("shadow_map layer {}", layer)),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                });
                let matrix: [[f32; 4]; 4] = view_projections[layer as usize].into();
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Light Space Buffer {}", layer)),
                    contents: bytemuck::cast_slice(&[matrix]),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                    label: Some(&format!("light_space_bind_group {}", layer)),
                });
                ShadowLayer {
                    view,
                    bind_group,
                    enabled: enabled[layer as usize],
                }
            })
            .collect();

        Self {
            texture,
            array_view,
            sampler,
            layers,
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector4;

    use super::*;

    fn project(m: Matrix4<f32>, p: [f32; 3]) -> Vector3<f32> {
        let clip = m * Vector4::new(p[0], p[1], p[2], 1.0);
        clip.truncate() / clip.w
    }

    fn inside(ndc: Vector3<f32>) -> bool {
        ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0 && (0.0..=1.0).contains(&ndc.z)
    }

    fn corners(b: &Aabb) -> Vec<[f32; 3]> {
        let mut out = Vec::new();
        for x in [b.min.x, b.max.x] {
            for y in [b.min.y, b.max.y] {
                for z in [b.min.z, b.max.z] {
                    out.push([x, y, z]);
                }
            }
        }
        out
    }

    #[test]
    fn directional_frustum_contains_the_scene() {
        let bounds = Aabb::from_points([-1.0, -2.0, -0.5], [3.0, 1.0, 0.5]);
        let m = directional_view_proj([5.0, 10.0, 7.0], &bounds);
        for c in corners(&bounds) {
            assert!(inside(project(m, c)), "{:?}", c);
        }
    }

    #[test]
    fn point_frustum_contains_the_scene() {
        let bounds = Aabb::from_points([-1.0; 3], [1.0; 3]);
        let m = point_view_proj([10.0, 10.0, 10.0], &bounds);
        for c in corners(&bounds) {
            assert!(inside(project(m, c)), "{:?}", c);
        }
    }

    #[test]
    fn empty_scene_still_yields_finite_matrices() {
        for m in light_view_projections(
            &[crate::scene::KEY_LIGHT, crate::scene::FILL_LIGHT],
            &Aabb::empty(),
        ) {
            let ndc = project(m, [0.0, 0.0, 0.0]);
            assert!(ndc.x.is_finite() && ndc.y.is_finite() && ndc.z.is_finite());
        }
    }
}

//! GPU vertex layout and per-draw mesh buffers.

use cgmath::{InnerSpace, Matrix, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::data_structures::scene_graph::WorldMesh;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// World-space vertex as consumed by the scene and shadow shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Bakes the world matrix of `mesh` into its vertices.
///
/// The scene is static for the single frame we draw, so transforming on the
/// CPU spares a per-draw model matrix.
pub fn world_vertices(mesh: &WorldMesh<'_>) -> Vec<ModelVertex> {
    let geometry = &mesh.mesh.geometry;
    let normals = geometry.normals_or_computed();
    let upper = cgmath::Matrix3::from_cols(
        mesh.world.x.truncate(),
        mesh.world.y.truncate(),
        mesh.world.z.truncate(),
    );
    let normal_matrix = upper.invert().map(|m| m.transpose()).unwrap_or(upper);

    geometry
        .positions()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let world = mesh.world * cgmath::Vector4::new(p[0], p[1], p[2], 1.0);
            let n = normal_matrix * cgmath::Vector3::from(normals[i]);
            let n = if n.magnitude2() > 0.0 { n.normalize() } else { n };
            ModelVertex {
                position: world.truncate().into(),
                normal: n.into(),
                tex_coords: geometry.tex_coords().map_or([0.0; 2], |uv| uv[i]),
            }
        })
        .collect()
}

/// Vertex and index buffers of one draw plus the bind group of its material.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material_bind_group: wgpu::BindGroup,
    pub cast_shadow: bool,
}

impl GpuMesh {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
        material_bind_group: wgpu::BindGroup,
        cast_shadow: bool,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            material_bind_group,
            cast_shadow,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::data_structures::{
        geometry::Geometry, material::Material, scene_graph::SceneNode,
    };

    use super::*;

    #[test]
    fn bakes_translation_and_rotation() {
        let g = Geometry::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            Some(vec![[0.0, 0.0, 1.0]; 3]),
            None,
            vec![0, 1, 2],
        )
        .unwrap();
        let mut node = SceneNode::with_mesh(g, Material::default());
        node.transform.position = cgmath::Vector3::new(0.0, 0.0, -2.0);
        node.transform.rotate_x(cgmath::Deg(180.0));
        let meshes = node.world_meshes();
        let verts = world_vertices(&meshes[0]);

        assert!((verts[2].position[1] + 1.0).abs() < 1e-5);
        assert!((verts[2].position[2] + 2.0).abs() < 1e-5);
        assert!((verts[0].normal[2] + 1.0).abs() < 1e-5);
        assert_eq!(verts[0].tex_coords, [0.0, 0.0]);
    }
}

//! Render pipelines of a snapshot.
//!
//! - `basic`: the lit scene pass (PBR shading, shadow lookups)
//! - `shadow`: depth-only passes rendering each shadow casting light's map
//! - `light`: uniform blocks shared by both

pub mod basic;
pub mod light;
pub mod shadow;

/// Every pipeline and bind group layout, created once per context.
#[derive(Debug)]
pub struct Pipelines {
    pub scene: wgpu::RenderPipeline,
    pub shadow: wgpu::RenderPipeline,
    pub globals_layout: wgpu::BindGroupLayout,
    pub material_layout: wgpu::BindGroupLayout,
    pub light_space_layout: wgpu::BindGroupLayout,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, sample_count: u32) -> Self {
        let globals_layout = basic::mk_globals_layout(device);
        let material_layout = basic::mk_material_layout(device);
        let light_space_layout = shadow::mk_light_space_layout(device);
        let scene = basic::mk_scene_pipeline(
            device,
            color_format,
            sample_count,
            &globals_layout,
            &material_layout,
        );
        let shadow = shadow::mk_shadow_pipeline(device, &light_space_layout);
        Self {
            scene,
            shadow,
            globals_layout,
            material_layout,
            light_space_layout,
        }
    }
}

/// Colour output of a pipeline; depth-only pipelines have none.
pub struct ColorTarget {
    pub format: wgpu::TextureFormat,
    pub blend: Option<wgpu::BlendState>,
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    color: Option<ColorTarget>,
    depth_format: Option<wgpu::TextureFormat>,
    depth_bias: wgpu::DepthBiasState,
    sample_count: u32,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);
    let targets = [color.map(|c| wgpu::ColorTargetState {
        format: c.format,
        blend: c.blend,
        write_mask: wgpu::ColorWrites::ALL,
    })];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: targets[0].is_some().then(|| wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // double sided, the shader flips back facing normals
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: depth_bias,
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

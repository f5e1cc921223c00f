//! Off-screen rasterization of an assembled, framed scene.
//!
//! A render runs in three GPU stages recorded into one command buffer:
//!
//! 1. one depth-only pass per shadow casting light, into its shadow map layer
//! 2. the lit scene pass into a (multisampled) colour target, resolved into
//!    an exactly `width` x `height` sRGB texture
//! 3. a copy of that texture into a mappable buffer
//!
//! The buffer rows are padded to [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`]; the
//! padding is stripped when the pixels are read back into a [`FrameBuffer`].

use std::{collections::HashMap, iter, sync::Arc};

use wgpu::util::DeviceExt;

use crate::{
    camera::Camera,
    context::{Context, TARGET_FORMAT},
    data_structures::{
        frame_buffer::{FrameBuffer, RowOrder},
        light::Light,
        model::{GpuMesh, world_vertices},
        scene_graph::WorldMesh,
        texture::{GpuTexture, Texture},
    },
    error::{RenderError, Result},
    pipelines::{
        light::{GlobalsUniform, MaterialUniform},
        shadow::{ShadowMaps, light_view_projections},
    },
    scene::AssembledScene,
};

/// Bytes per row of the copy buffer: `width * 4` rounded up to the copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drops the per-row padding of a texture copy.
pub fn strip_row_padding(padded: &[u8], width: u32, height: u32) -> Vec<u8> {
    let stride = padded_bytes_per_row(width) as usize;
    let row = width as usize * 4;
    let mut out = Vec::with_capacity(row * height as usize);
    for chunk in padded.chunks(stride).take(height as usize) {
        out.extend_from_slice(&chunk[..row]);
    }
    out
}

/// Renders `scene` as seen by `camera` and reads the pixels back.
pub async fn rasterize(
    ctx: &Context,
    scene: &AssembledScene,
    camera: &Camera,
    width: u32,
    height: u32,
) -> Result<FrameBuffer> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions(format!("{}x{}", width, height)));
    }
    if width > ctx.max_texture_dimension || height > ctx.max_texture_dimension {
        return Err(RenderError::ContextCreation(format!(
            "{}x{} exceeds the adapter's maximum texture size of {}",
            width, height, ctx.max_texture_dimension
        )));
    }

    ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let submitted = submit(ctx, scene, camera, width, height);
    let validation = ctx.device.pop_error_scope().await;
    let out_of_memory = ctx.device.pop_error_scope().await;
    if let Some(e) = validation.or(out_of_memory) {
        return Err(RenderError::Gpu(e.to_string()));
    }
    let (output_buffer, mapped) = submitted?;

    mapped
        .receive()
        .await
        .ok_or_else(|| RenderError::Gpu("readback was never signalled".to_string()))?
        .map_err(|e| RenderError::Gpu(e.to_string()))?;
    let pixels = {
        let data = output_buffer.slice(..).get_mapped_range();
        strip_row_padding(&data, width, height)
    };
    output_buffer.unmap();
    FrameBuffer::new(width, height, RowOrder::TopDown, pixels)
}

type MapResult = std::result::Result<(), wgpu::BufferAsyncError>;

/// Records and submits every pass, then waits for the GPU. Returns the
/// readback buffer and the channel its mapping result arrives on.
fn submit(
    ctx: &Context,
    scene: &AssembledScene,
    camera: &Camera,
    width: u32,
    height: u32,
) -> Result<(
    wgpu::Buffer,
    futures_intrusive::channel::shared::OneshotReceiver<MapResult>,
)> {
    let device = &ctx.device;
    let world_meshes = scene.root.world_meshes();
    let meshes = upload_meshes(ctx, &world_meshes);
    log::debug!("uploaded {} meshes", meshes.len());

    let bounds = scene.bounds();
    let view_projections = light_view_projections(&scene.lights, &bounds);
    let enabled = [
        scene
            .lights
            .iter()
            .any(|l| matches!(l, Light::Directional { cast_shadow: true, .. })),
        scene
            .lights
            .iter()
            .any(|l| matches!(l, Light::Point { cast_shadow: true, .. })),
    ];
    let shadow_maps = ShadowMaps::new(
        device,
        &ctx.pipelines.light_space_layout,
        ctx.shadow_map_size,
        &view_projections,
        enabled,
    );

    let globals = GlobalsUniform::new(camera, &scene.lights, view_projections, ctx.shadow_map_size);
    let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Globals Buffer"),
        contents: bytemuck::cast_slice(&[globals]),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &ctx.pipelines.globals_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_maps.array_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&shadow_maps.sampler),
            },
        ],
        label: Some("globals_bind_group"),
    });

    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let resolved = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Snapshot Output Texture"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let resolved_view = resolved.create_view(&wgpu::TextureViewDescriptor::default());
    let multisampled = (ctx.sample_count > 1).then(|| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Snapshot Multisampled Texture"),
                size: extent,
                mip_level_count: 1,
                sample_count: ctx.sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    });
    let depth = GpuTexture::create_depth_texture(
        device,
        [width, height],
        ctx.sample_count,
        "depth_texture",
    );

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Render Encoder"),
    });

    for (layer, shadow) in shadow_maps.layers.iter().enumerate() {
        let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&format!("Shadow Pass {}", layer)),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &shadow.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        if !shadow.enabled {
            continue;
        }
        shadow_pass.set_pipeline(&ctx.pipelines.shadow);
        shadow_pass.set_bind_group(0, &shadow.bind_group, &[]);
        for mesh in meshes.iter().filter(|m| m.cast_shadow) {
            shadow_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            shadow_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            shadow_pass.draw_indexed(0..mesh.num_elements, 0, 0..1);
        }
    }

    {
        let (view, resolve_target, store) = match &multisampled {
            Some(msaa) => (msaa, Some(&resolved_view), wgpu::StoreOp::Discard),
            None => (&resolved_view, None, wgpu::StoreOp::Store),
        };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.clear_colour),
                    store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(&ctx.pipelines.scene);
        render_pass.set_bind_group(0, &globals_bind_group, &[]);
        for mesh in &meshes {
            render_pass.set_bind_group(1, &mesh.material_bind_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.num_elements, 0, 0..1);
        }
    }

    let bytes_per_row = padded_bytes_per_row(width);
    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Snapshot Readback Buffer"),
        size: bytes_per_row as wgpu::BufferAddress * height as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &resolved,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        extent,
    );

    ctx.queue.submit(iter::once(encoder.finish()));

    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    output_buffer
        .slice(..)
        .map_async(wgpu::MapMode::Read, move |result| {
            // The receiver only disappears if the render was abandoned.
            let _ = tx.send(result);
        });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|e| RenderError::Gpu(e.to_string()))?;
    Ok((output_buffer, rx))
}

/// Uploads every mesh with world space vertices and a material bind group.
/// Textures shared between materials are uploaded once.
fn upload_meshes(ctx: &Context, world_meshes: &[WorldMesh<'_>]) -> Vec<GpuMesh> {
    let device = &ctx.device;
    let white = GpuTexture::create_white(device, &ctx.queue);
    let mut uploaded: HashMap<*const Texture, GpuTexture> = HashMap::new();

    for mesh in world_meshes {
        if let Some(texture) = &mesh.mesh.material.texture {
            let key = Arc::as_ptr(texture);
            if uploaded.contains_key(&key) {
                continue;
            }
            // A texture that cannot be fitted leaves its material untextured.
            match texture.fit_within(ctx.max_texture_dimension) {
                Ok(fitted) => {
                    let gpu = GpuTexture::from_texture(device, &ctx.queue, &fitted, Some("base colour texture"));
                    uploaded.insert(key, gpu);
                }
                Err(e) => log::warn!("{}", e),
            }
        }
    }

    world_meshes
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.mesh.geometry.indices().is_empty())
        .map(|(i, m)| {
            let material = &m.mesh.material;
            let texture = material
                .texture
                .as_ref()
                .and_then(|t| uploaded.get(&Arc::as_ptr(t)))
                .unwrap_or(&white);
            let sampler = texture.sampler.as_ref().or(white.sampler.as_ref());

            let uniform = MaterialUniform::new(material, m.receive_shadow);
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Material Buffer {}", i)),
                contents: bytemuck::cast_slice(&[uniform]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let mut entries = vec![
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
            ];
            if let Some(sampler) = sampler {
                entries.push(wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                });
            }
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &ctx.pipelines.material_layout,
                entries: &entries,
                label: Some(&format!("material_bind_group {}", i)),
            });

            let vertices = world_vertices(m);
            GpuMesh::new(
                device,
                &format!("Mesh {}", i),
                &vertices,
                m.mesh.geometry.indices(),
                bind_group,
                m.cast_shadow,
            )
        })
        .collect()
}

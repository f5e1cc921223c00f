//! The snapshot pipeline, end to end.
//!
//! Data flows strictly forward, every stage finishes before the next starts:
//!
//! 1. decode the model (all textures resolved or recorded as missing)
//! 2. assemble the lit scene and apply the format's orientation
//! 3. frame the camera around the world bounds
//! 4. create the off-screen context and rasterize
//! 5. encode the pixels as PNG
//!
//! A failure at any stage aborts the run and no output file is produced.

use std::path::{Path, PathBuf};

use crate::{
    camera::{self, Camera},
    cli::{CliArgs, Dimensions},
    config::RenderConfig,
    context::Context,
    data_structures::frame_buffer::FrameBuffer,
    encode,
    error::{RenderError, Result},
    render,
    resources::{self, AssetSource, FsSource, ModelFormat},
    scene,
};

/// One model to one image.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderRequest {
    pub model: PathBuf,
    pub dimensions: Dimensions,
    pub output: PathBuf,
}

impl From<CliArgs> for RenderRequest {
    fn from(args: CliArgs) -> Self {
        Self {
            model: args.model,
            dimensions: args.dimensions,
            output: args.output,
        }
    }
}

/// A rendered frame and what went into it.
#[derive(Debug)]
pub struct Snapshot {
    pub frame: FrameBuffer,
    pub format: ModelFormat,
    pub camera: Camera,
    pub mesh_count: usize,
    pub triangle_count: usize,
    /// Non-fatal decode problems, e.g. missing blobs.
    pub warnings: Vec<RenderError>,
    pub adapter: String,
}

/// Summary of a completed [`render_model`] run.
#[derive(Debug)]
pub struct RenderReport {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: ModelFormat,
    pub mesh_count: usize,
    pub triangle_count: usize,
    pub warnings: Vec<RenderError>,
}

/// Decodes `model` through `source` and renders it at `dimensions`.
pub async fn snapshot(
    model: &Path,
    dimensions: Dimensions,
    config: &RenderConfig,
    source: &impl AssetSource,
) -> Result<Snapshot> {
    let mut decoded = resources::load_model(model, source).await?;
    let format = decoded.format;
    let warnings = std::mem::take(&mut decoded.report.warnings);

    let assembled = scene::assemble(decoded);
    let bounds = assembled.bounds();
    if bounds.is_empty() {
        log::warn!("{} contains no drawable geometry", model.display());
    }
    let camera = camera::frame_scene(&bounds, dimensions.width, dimensions.height, config);

    let ctx = Context::new(config).await?;
    let frame = render::rasterize(&ctx, &assembled, &camera, dimensions.width, dimensions.height).await?;

    Ok(Snapshot {
        frame,
        format,
        camera,
        mesh_count: assembled.root.mesh_count(),
        triangle_count: assembled.root.triangle_count(),
        warnings,
        adapter: ctx.adapter_info.name.clone(),
    })
}

/// Renders the requested model from disk and writes the PNG.
pub async fn render_model(request: &RenderRequest, config: &RenderConfig) -> Result<RenderReport> {
    let exists = tokio::fs::try_exists(&request.model)
        .await
        .map_err(|source| RenderError::Io {
            path: request.model.clone(),
            source,
        })?;
    if !exists {
        return Err(RenderError::FileNotFound(request.model.clone()));
    }

    let shot = snapshot(&request.model, request.dimensions, config, &FsSource).await?;
    log::info!(
        "rendered {} meshes ({} triangles) at {} on {}",
        shot.mesh_count,
        shot.triangle_count,
        request.dimensions,
        shot.adapter
    );
    encode::write_png(shot.frame, &request.output)?;

    Ok(RenderReport {
        output: request.output.clone(),
        width: request.dimensions.width,
        height: request.dimensions.height,
        format: shot.format,
        mesh_count: shot.mesh_count,
        triangle_count: shot.triangle_count,
        warnings: shot.warnings,
    })
}

use crate::{
    config::RenderConfig,
    error::{RenderError, Result},
    pipelines::{self, Pipelines},
};

/// Format of the off-screen colour target. Writing to an sRGB target applies
/// the gamma encoding the PNG expects.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Off-screen GPU context: no window, no surface. Owns the device, the queue
/// and every pipeline a render needs.
#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    /// MSAA sample count actually used, see [`RenderConfig::sample_count`].
    pub sample_count: u32,
    pub max_texture_dimension: u32,
    pub clear_colour: wgpu::Color,
    pub shadow_map_size: u32,
    pub pipelines: Pipelines,
}

impl Context {
    /// Creates the context on any available adapter, falling back to a
    /// software adapter when there is no hardware one.
    pub async fn new(config: &RenderConfig) -> Result<Self> {
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::from_env().unwrap_or(wgpu::Backends::all()),
            ..Default::default()
        });

        let adapter = match request_adapter(&instance, false).await {
            Ok(adapter) => adapter,
            Err(e) => {
                log::warn!("no hardware adapter ({}), trying a fallback adapter", e);
                request_adapter(&instance, true)
                    .await
                    .map_err(|e| RenderError::ContextCreation(e.to_string()))?
            }
        };
        let adapter_info = adapter.get_info();
        log::info!("using {} ({:?})", adapter_info.name, adapter_info.backend);

        log::debug!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("model-snap device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RenderError::ContextCreation(e.to_string()))?;

        let sample_count = supported_sample_count(&adapter, config.sample_count);
        if sample_count != config.sample_count {
            log::warn!(
                "{}x MSAA unsupported for {:?}, rendering with {} sample(s)",
                config.sample_count,
                TARGET_FORMAT,
                sample_count
            );
        }

        let max_texture_dimension = device.limits().max_texture_dimension_2d;
        let shadow_map_size = config.shadow_map_size.clamp(1, max_texture_dimension);
        let pipelines = pipelines::Pipelines::new(&device, TARGET_FORMAT, sample_count);

        Ok(Self {
            device,
            queue,
            adapter_info,
            sample_count,
            max_texture_dimension,
            clear_colour: config.clear_colour,
            shadow_map_size,
            pipelines,
        })
    }
}

async fn request_adapter(
    instance: &wgpu::Instance,
    force_fallback_adapter: bool,
) -> std::result::Result<wgpu::Adapter, wgpu::RequestAdapterError> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter,
        })
        .await
}

/// `requested` when both the colour and depth formats support it, 1 otherwise.
fn supported_sample_count(adapter: &wgpu::Adapter, requested: u32) -> u32 {
    if requested <= 1 {
        return 1;
    }
    let supports = |format| {
        adapter
            .get_texture_format_features(format)
            .flags
            .sample_count_supported(requested)
    };
    if supports(TARGET_FORMAT) && supports(crate::data_structures::texture::GpuTexture::DEPTH_FORMAT) {
        requested
    } else {
        1
    }
}

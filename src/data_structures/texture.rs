//! Decoded textures and their GPU counterparts.
//!
//! [`Texture`] is the CPU side result of decoding: plain RGBA8 pixels plus the
//! reference that produced them. [`GpuTexture`] wraps the WGPU texture, view
//! and sampler built from it, and the helpers for depth and fallback textures
//! the rasterizer needs.

use std::{borrow::Cow, path::PathBuf};

use image::{GenericImageView, ImageFormat};

use crate::error::{RenderError, Result};

/// Where the pixels of a [`Texture`] came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextureSource {
    /// A file next to the model.
    External(PathBuf),
    /// An internal `blob:` id resolved through the package's blob store.
    Blob(String),
    /// A buffer view inside one of the package buffers.
    BufferView { view: usize },
    /// A `data:` URI inlined in the document.
    Inline,
}

/// Fully decoded image, RGBA with 8 bits per channel, rows top to bottom.
#[derive(Clone, Debug)]
pub struct Texture {
    pub source: TextureSource,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Texture {
    /// Decode encoded image bytes (PNG, JPEG, ...).
    ///
    /// `mime_type` is a hint such as `image/png`; without it the format is guessed.
    pub fn from_bytes(source: TextureSource, bytes: &[u8], mime_type: Option<&str>) -> Result<Self> {
        let format = mime_type
            .and_then(|mt| mt.split('/').next_back())
            .and_then(ImageFormat::from_extension);
        let decoded = match format {
            Some(fmt) => image::load_from_memory_with_format(bytes, fmt),
            None => image::load_from_memory(bytes),
        };
        let img = decoded.map_err(|e| RenderError::MissingTexture {
            uri: format!("{:?}", source),
            reason: e.to_string(),
        })?;
        Ok(Self::from_image(source, &img))
    }

    pub fn from_image(source: TextureSource, img: &image::DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            source,
            width,
            height,
            rgba: img.to_rgba8().into_raw(),
        }
    }

    /// This texture, downscaled when either side exceeds `max_dimension`.
    /// The aspect ratio is kept and no side drops below one pixel.
    pub fn fit_within(&self, max_dimension: u32) -> Result<Cow<'_, Texture>> {
        let max_dimension = max_dimension.max(1);
        if self.width <= max_dimension && self.height <= max_dimension {
            return Ok(Cow::Borrowed(self));
        }
        let scale = max_dimension as f64 / self.width.max(self.height) as f64;
        let width = ((self.width as f64 * scale).round() as u32).clamp(1, max_dimension);
        let height = ((self.height as f64 * scale).round() as u32).clamp(1, max_dimension);

        let img = image::RgbaImage::from_raw(self.width, self.height, self.rgba.clone()).ok_or_else(
            || RenderError::MissingTexture {
                uri: format!("{:?}", self.source),
                reason: format!("{} bytes do not hold {}x{} pixels", self.rgba.len(), self.width, self.height),
            },
        )?;
        log::warn!(
            "texture {:?} is {}x{}, the device allows {}; downscaling to {}x{}",
            self.source,
            self.width,
            self.height,
            max_dimension,
            width,
            height
        );
        let resized = image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle);
        Ok(Cow::Owned(Texture {
            source: self.source.clone(),
            width,
            height,
            rgba: resized.into_raw(),
        }))
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Debug)]
pub struct GpuTexture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl GpuTexture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing the main pass.
    ///
    /// `sample_count` must match the colour attachment it is paired with.
    pub fn create_depth_texture(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// A 1x1 white texture bound for materials without a base colour map, so
    /// the shader can always sample.
    pub fn create_white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let white = Texture {
            source: TextureSource::Inline,
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        };
        Self::from_texture(device, queue, &white, Some("white fallback texture"))
    }

    /// Upload a decoded texture. Colour textures are stored as sRGB so sampling
    /// returns linear values.
    pub fn from_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        tex: &Texture,
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: tex.width,
            height: tex.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &tex.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * tex.width),
                rows_per_image: Some(tex.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_default_sampler(device));

        Self {
            texture,
            view,
            sampler,
        }
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 128])
            }
        });
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_with_mime_hint() {
        let tex = Texture::from_bytes(TextureSource::Inline, &png_bytes(), Some("image/png")).unwrap();
        assert_eq!((tex.width, tex.height), (2, 1));
        assert_eq!(tex.rgba, vec![255, 0, 0, 255, 0, 0, 255, 128]);
    }

    #[test]
    fn oversized_textures_are_downscaled_to_the_limit() {
        let wide = Texture {
            source: TextureSource::Blob("strip".into()),
            width: 20000,
            height: 2,
            rgba: [255, 0, 0, 255].repeat(40000),
        };
        let fitted = wide.fit_within(16384).unwrap();

        assert!(matches!(fitted, Cow::Owned(_)));
        assert_eq!((fitted.width, fitted.height), (16384, 2));
        assert_eq!(fitted.rgba.len(), 16384 * 2 * 4);
        assert_eq!(&fitted.rgba[..4], &[255, 0, 0, 255]);
        assert_eq!(fitted.source, wide.source);
    }

    #[test]
    fn textures_within_the_limit_are_borrowed() {
        let tex = Texture::from_bytes(TextureSource::Inline, &png_bytes(), None).unwrap();
        assert!(matches!(tex.fit_within(16384).unwrap(), Cow::Borrowed(_)));

        let tall = Texture {
            source: TextureSource::Inline,
            width: 3,
            height: 300,
            rgba: vec![0; 3 * 300 * 4],
        };
        let fitted = tall.fit_within(100).unwrap();
        assert_eq!((fitted.width, fitted.height), (1, 100));
    }

    #[test]
    fn garbage_is_a_missing_texture() {
        let err = Texture::from_bytes(TextureSource::Blob("x".into()), b"nope", None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MissingTexture);
        assert!(!err.is_fatal());
    }
}

//! PNG encoding of a rendered [`FrameBuffer`].
//!
//! PNG stores rows top to bottom. Buffers read back bottom to top are flipped
//! first, so the first encoded row is always the visual top of the render.
//! Files are written to a temporary sibling and renamed into place, so a
//! failed encode never leaves a partial image behind.

use std::{io::Write, path::Path};

use image::{ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};

use crate::{
    data_structures::frame_buffer::FrameBuffer,
    error::{RenderError, Result},
};

/// Encodes `frame` as an RGBA8 PNG into `out`.
pub fn encode_png(frame: FrameBuffer, out: impl Write) -> Result<()> {
    let (width, height) = (frame.width(), frame.height());
    let pixels = frame.into_top_down();
    PngEncoder::new(out)
        .write_image(&pixels, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| RenderError::Encode(e.to_string()))
}

/// Encodes `frame` and atomically replaces `path` with the result.
pub fn write_png(frame: FrameBuffer, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let encode_err = |e: std::io::Error| RenderError::Encode(format!("{}: {}", path.display(), e));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(encode_err)?;
    {
        let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
        encode_png(frame, &mut writer)?;
        writer.flush().map_err(encode_err)?;
    }
    tmp.persist(path).map_err(|e| encode_err(e.error))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

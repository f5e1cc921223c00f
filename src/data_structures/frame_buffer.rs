//! The pixel buffer handed from the rasterizer to the image encoder.

use crate::error::{RenderError, Result};

/// Order in which rows are stored in a [`FrameBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowOrder {
    /// First row is the visual top of the image (WGPU texture copies, PNG).
    TopDown,
    /// First row is the visual bottom of the image (OpenGL style read-backs).
    BottomUp,
}

/// RGBA8 pixels. `data.len() == width * height * 4` always holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    row_order: RowOrder,
    data: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32, row_order: RowOrder, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(RenderError::Gpu(format!(
                "frame buffer holds {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            row_order,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGBA of the pixel at `(x, y)`, `y` counted from the visual top.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let row = match self.row_order {
            RowOrder::TopDown => y,
            RowOrder::BottomUp => self.height - 1 - y,
        };
        let i = (row as usize * self.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Consumes the buffer and returns its bytes with rows ordered top to bottom.
    pub fn into_top_down(self) -> Vec<u8> {
        match self.row_order {
            RowOrder::TopDown => self.data,
            RowOrder::BottomUp => {
                let stride = self.width as usize * 4;
                if stride == 0 {
                    return self.data;
                }
                self.data
                    .chunks_exact(stride)
                    .rev()
                    .flatten()
                    .copied()
                    .collect()
            }
        }
    }
}

//! model-snap
//!
//! A headless renderer that turns one 3D model file into one PNG. Models are
//! decoded into a small scene graph, lit by a fixed three light rig, framed by
//! an automatic camera and rasterized off-screen with WGPU.
//!
//! High-level modules
//! - `resources`: model decoding (STL, glTF/GLB) behind an injectable asset source
//! - `data_structures`: scene graph, geometry, materials, textures, frame buffers
//! - `scene`: lighting rig and per-format orientation
//! - `camera`: automatic framing and projection
//! - `context`: off-screen GPU device, queue and pipelines
//! - `pipelines`: scene and shadow pipelines with their uniforms
//! - `render`: the rasterizer and pixel read-back
//! - `encode`: PNG output
//! - `flow`: the end to end pipeline
//! - `cli`, `config`, `error`: argument parsing, tunables, error taxonomy
//!

pub mod camera;
pub mod cli;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod encode;
pub mod error;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

pub use config::RenderConfig;
pub use error::{ErrorKind, RenderError};
pub use flow::{RenderReport, RenderRequest, render_model, snapshot};

//! Engine data structures: geometry, materials, textures, lights and scene graphs.
//!
//! - `transform` holds node local translation/rotation/scale
//! - `geometry` contains the indexed triangle list and bounding boxes
//! - `material` and `texture` describe surfaces; `texture` also uploads to the GPU
//! - `light` lists the supported light sources
//! - `scene_graph` is the owned node tree produced by decoding
//! - `model` is the GPU vertex layout and per-draw buffers
//! - `frame_buffer` is the rendered pixel buffer handed to the encoder

pub mod frame_buffer;
pub mod geometry;
pub mod light;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod transform;

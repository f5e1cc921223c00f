//! Tunables of a render.
//!
//! Every field has a default matching the stock look of a snapshot; callers
//! override only what they need:
//!
//! ```
//! let config = model_snap::config::RenderConfig {
//!     padding: 2.0,
//!     ..Default::default()
//! };
//! assert_eq!(config.fov_y, cgmath::Deg(45.0));
//! ```

/// Camera, background and rasterizer settings.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Vertical field of view of the framing camera.
    pub fov_y: cgmath::Deg<f32>,
    pub near: f32,
    /// Lower bound of the far plane; it is pushed out for large models.
    pub far: f32,
    /// Multiplier on the distance at which the model exactly fills the view.
    pub padding: f32,
    /// Camera distance used when the model has no usable extent.
    pub fallback_distance: f32,
    /// The single background colour, in sRGB.
    pub clear_colour: wgpu::Color,
    /// Requested MSAA sample count; lowered to 1 when the adapter cannot do it.
    pub sample_count: u32,
    /// Edge length of each shadow map layer.
    pub shadow_map_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fov_y: cgmath::Deg(45.0),
            near: 0.1,
            far: 1000.0,
            padding: 1.5,
            fallback_distance: 5.0,
            clear_colour: wgpu::Color::BLACK,
            sample_count: 4,
            shadow_map_size: 2048,
        }
    }
}

//! Surface description attached to every mesh.

use std::sync::Arc;

use crate::data_structures::texture::Texture;

/// Metal/roughness material.
///
/// `texture` is either a fully decoded image or `None`; there is no pending
/// state. Textures are shared between materials that reference the same image.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: Option<String>,
    /// Linear RGBA multiplier applied to the texture (or used alone).
    pub base_color: [f32; 4],
    pub metalness: f32,
    pub roughness: f32,
    pub texture: Option<Arc<Texture>>,
}

impl Material {
    /// White, slightly metallic, mostly rough. Used for formats without materials.
    pub fn mesh_default() -> Self {
        Self {
            name: Some("default".to_string()),
            base_color: [1.0, 1.0, 1.0, 1.0],
            metalness: 0.3,
            roughness: 0.7,
            texture: None,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::mesh_default()
    }
}

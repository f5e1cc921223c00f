//! Scene assembly: the decoded model plus a fixed lighting rig.
//!
//! The rig never depends on the model. It holds an ambient light, a shadow
//! casting directional light and a shadow casting point light, placed in
//! world space around the origin.

use cgmath::Deg;

use crate::{
    data_structures::{geometry::Aabb, light::Light, scene_graph::SceneNode},
    resources::{DecodedModel, ModelFormat},
};

/// STL exporters tend to author with +Z up and the opposite facing to the
/// default camera; a half turn about X puts the top of the part at the top of the image.
pub const TRIANGLE_MESH_ORIENTATION: Deg<f32> = Deg(180.0);

/// Turns glTF packages (+Y up) the opposite way, matching the mesh correction's handedness.
pub const SCENE_PACKAGE_ORIENTATION: Deg<f32> = Deg(-180.0);

pub const AMBIENT_LIGHT: Light = Light::Ambient {
    color: [1.0, 1.0, 1.0],
    intensity: 0.8,
};

pub const KEY_LIGHT: Light = Light::Directional {
    color: [1.0, 1.0, 1.0],
    intensity: 1.5,
    position: [5.0, 10.0, 7.0],
    cast_shadow: true,
};

pub const FILL_LIGHT: Light = Light::Point {
    color: [1.0, 1.0, 1.0],
    intensity: 1.5,
    position: [10.0, 10.0, 10.0],
    cast_shadow: true,
};

/// A model ready for framing: oriented, shadow flagged and lit.
#[derive(Debug)]
pub struct AssembledScene {
    pub root: SceneNode,
    pub lights: Vec<Light>,
}

impl AssembledScene {
    /// World bounds of all geometry, after orientation.
    pub fn bounds(&self) -> Aabb {
        self.root.world_bounds()
    }
}

pub fn orientation_for(format: ModelFormat) -> Deg<f32> {
    match format {
        ModelFormat::TriangleMesh => TRIANGLE_MESH_ORIENTATION,
        ModelFormat::ScenePackage => SCENE_PACKAGE_ORIENTATION,
    }
}

/// Applies the format's orientation once, flags every mesh for shadows and
/// adds the lighting rig.
pub fn assemble(model: DecodedModel) -> AssembledScene {
    let DecodedModel { format, mut root, .. } = model;
    root.transform.rotate_x(orientation_for(format));
    root.for_each_mut(&mut |node| {
        if node.mesh.is_some() {
            node.cast_shadow = true;
            node.receive_shadow = true;
        }
    });
    let lights = vec![AMBIENT_LIGHT, KEY_LIGHT, FILL_LIGHT];
    log::debug!(
        "assembled {} meshes ({} triangles) with {} lights",
        root.mesh_count(),
        root.triangle_count(),
        lights.len()
    );
    AssembledScene { root, lights }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::{geometry::Geometry, material::Material},
        resources::DecodeReport,
    };

    fn model(format: ModelFormat) -> DecodedModel {
        let geometry = Geometry::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 3.0]],
            None,
            None,
            vec![0, 1, 2],
        )
        .unwrap();
        let mut root = SceneNode::new();
        root.add_child(SceneNode::with_mesh(geometry, Material::mesh_default()));
        DecodedModel {
            format,
            root,
            textures: Vec::new(),
            report: DecodeReport::default(),
        }
    }

    #[test]
    fn rig_is_always_present() {
        let scene = assemble(model(ModelFormat::TriangleMesh));
        assert_eq!(scene.lights.len(), 3);
        assert!(!scene.lights[0].casts_shadow());
        assert!(scene.lights[1].casts_shadow());
        assert!(scene.lights[2].casts_shadow());
    }

    #[test]
    fn meshes_cast_and_receive_shadows() {
        let scene = assemble(model(ModelFormat::ScenePackage));
        let meshes = scene.root.world_meshes();
        assert_eq!(meshes.len(), 1);
        assert!(meshes[0].cast_shadow && meshes[0].receive_shadow);
        assert!(!scene.root.cast_shadow);
    }

    #[test]
    fn orientation_flips_y_and_z_once() {
        for format in [ModelFormat::TriangleMesh, ModelFormat::ScenePackage] {
            let bounds = assemble(model(format)).bounds();
            assert!((bounds.min.y + 2.0).abs() < 1e-5, "{:?}", format);
            assert!(bounds.max.y.abs() < 1e-5);
            assert!((bounds.min.z + 3.0).abs() < 1e-5);
            assert!((bounds.max.x - 1.0).abs() < 1e-5);
        }
    }
}

//! Scene graph: an owned tree of transformed nodes.
//!
//! Every node exclusively owns its children, so the graph can neither share
//! subtrees nor contain cycles. Geometry and material live directly on the
//! node that draws them.

use cgmath::SquareMatrix;

use crate::data_structures::{
    geometry::{Aabb, Geometry},
    material::Material,
    transform::Transform,
};

/// Geometry together with the material it is drawn with.
#[derive(Clone, Debug)]
pub struct MeshPart {
    pub geometry: Geometry,
    pub material: Material,
}

#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub name: Option<String>,
    pub transform: Transform,
    pub mesh: Option<MeshPart>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub children: Vec<SceneNode>,
}

/// A mesh bearing node flattened into world space, see [`SceneNode::visit_meshes`].
pub struct WorldMesh<'a> {
    pub world: cgmath::Matrix4<f32>,
    pub mesh: &'a MeshPart,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl SceneNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mesh(geometry: Geometry, material: Material) -> Self {
        Self {
            mesh: Some(MeshPart { geometry, material }),
            ..Self::default()
        }
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// Calls `f` for every mesh in the subtree, depth first, with the
    /// accumulated world matrix. `parent` is the world matrix of this node's parent.
    pub fn visit_meshes<'a>(
        &'a self,
        parent: &cgmath::Matrix4<f32>,
        f: &mut dyn FnMut(WorldMesh<'a>),
    ) {
        let world = parent * self.transform.to_matrix();
        if let Some(mesh) = &self.mesh {
            f(WorldMesh {
                world,
                mesh,
                cast_shadow: self.cast_shadow,
                receive_shadow: self.receive_shadow,
            });
        }
        for child in &self.children {
            child.visit_meshes(&world, f);
        }
    }

    /// All meshes of the tree rooted at `self`, in world space.
    pub fn world_meshes(&self) -> Vec<WorldMesh<'_>> {
        let mut out = Vec::new();
        self.visit_meshes(&cgmath::Matrix4::identity(), &mut |m| out.push(m));
        out
    }

    /// Applies `f` to every node of the subtree.
    pub fn for_each_mut(&mut self, f: &mut dyn FnMut(&mut SceneNode)) {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }

    /// World-space bounding box of every mesh in the tree.
    pub fn world_bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for m in self.world_meshes() {
            bounds.union(&m.mesh.geometry.bounds(&m.world));
        }
        bounds
    }

    pub fn mesh_count(&self) -> usize {
        self.mesh.is_some() as usize + self.children.iter().map(SceneNode::mesh_count).sum::<usize>()
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.as_ref().map_or(0, |m| m.geometry.triangle_count())
            + self.children.iter().map(SceneNode::triangle_count).sum::<usize>()
    }

    /// Every material in the tree, depth first.
    pub fn materials(&self) -> Vec<&Material> {
        let mut out = Vec::new();
        self.visit_meshes(&cgmath::Matrix4::identity(), &mut |m| out.push(&m.mesh.material));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Geometry {
        Geometry::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            None,
            vec![0, 1, 2],
        )
        .unwrap()
    }

    #[test]
    fn bounds_include_parent_transforms() {
        let mut root = SceneNode::new();
        root.transform.position = cgmath::Vector3::new(10.0, 0.0, 0.0);
        let mut child = SceneNode::with_mesh(triangle(), Material::default());
        child.transform.scale = cgmath::Vector3::new(2.0, 2.0, 2.0);
        root.add_child(child);

        let b = root.world_bounds();
        assert_eq!(b.min, cgmath::Point3::new(10.0, 0.0, 0.0));
        assert_eq!(b.max, cgmath::Point3::new(12.0, 2.0, 0.0));
        assert_eq!(root.mesh_count(), 1);
        assert_eq!(root.triangle_count(), 1);
    }

    #[test]
    fn empty_tree_has_empty_bounds() {
        let mut root = SceneNode::new();
        root.add_child(SceneNode::new());
        assert!(root.world_bounds().is_empty());
        assert_eq!(root.mesh_count(), 0);
    }
}

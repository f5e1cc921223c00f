//! CPU side triangle geometry and axis-aligned bounds.

use cgmath::{EuclideanSpace, InnerSpace, Transform as _};

use crate::error::{RenderError, Result};

/// Indexed triangle list.
///
/// Invariant (checked by [`Geometry::new`]): every index addresses a vertex
/// and the index count is a multiple of 3. Normals and UVs, when present, have
/// exactly one entry per position.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    positions: Vec<[f32; 3]>,
    normals: Option<Vec<[f32; 3]>>,
    tex_coords: Option<Vec<[f32; 2]>>,
    indices: Vec<u32>,
}

impl Geometry {
    pub fn new(
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        tex_coords: Option<Vec<[f32; 2]>>,
        indices: Vec<u32>,
    ) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(RenderError::Parse(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(RenderError::Parse(format!(
                "index {} out of range for {} vertices",
                bad,
                positions.len()
            )));
        }
        if normals.as_ref().is_some_and(|n| n.len() != positions.len()) {
            return Err(RenderError::Parse(
                "normal count does not match position count".to_string(),
            ));
        }
        if tex_coords.as_ref().is_some_and(|t| t.len() != positions.len()) {
            return Err(RenderError::Parse(
                "uv count does not match position count".to_string(),
            ));
        }
        Ok(Self {
            positions,
            normals,
            tex_coords,
            indices,
        })
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> Option<&[[f32; 3]]> {
        self.normals.as_deref()
    }

    pub fn tex_coords(&self) -> Option<&[[f32; 2]]> {
        self.tex_coords.as_deref()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Per-vertex normals, falling back to area weighted face normals when the
    /// source carried none.
    pub fn normals_or_computed(&self) -> Vec<[f32; 3]> {
        if let Some(normals) = &self.normals {
            return normals.clone();
        }
        let mut acc = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let p0: cgmath::Vector3<f32> = self.positions[tri[0] as usize].into();
            let p1: cgmath::Vector3<f32> = self.positions[tri[1] as usize].into();
            let p2: cgmath::Vector3<f32> = self.positions[tri[2] as usize].into();
            let face = (p1 - p0).cross(p2 - p0);
            for &i in tri {
                acc[i as usize] += face;
            }
        }
        acc.into_iter()
            .map(|n| {
                if n.magnitude2() > 0.0 {
                    n.normalize().into()
                } else {
                    [0.0, 1.0, 0.0]
                }
            })
            .collect()
    }

    /// Bounds of the vertices after applying `matrix`.
    pub fn bounds(&self, matrix: &cgmath::Matrix4<f32>) -> Aabb {
        let mut bounds = Aabb::empty();
        for p in &self.positions {
            bounds.include(matrix.transform_point(cgmath::Point3::from(*p)));
        }
        bounds
    }
}

/// Axis-aligned bounding box. An empty box has `min > max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: cgmath::Point3<f32>,
    pub max: cgmath::Point3<f32>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: cgmath::Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: cgmath::Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn from_points(min: [f32; 3], max: [f32; 3]) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include(&mut self, p: cgmath::Point3<f32>) {
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return;
        }
        self.min = cgmath::Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = cgmath::Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.include(other.min);
        self.include(other.max);
    }

    /// Center of the box, the origin for an empty box.
    pub fn center(&self) -> cgmath::Point3<f32> {
        if self.is_empty() {
            return cgmath::Point3::origin();
        }
        self.min.midpoint(self.max)
    }

    /// Per-axis size, zero for an empty box.
    pub fn extent(&self) -> cgmath::Vector3<f32> {
        if self.is_empty() {
            return cgmath::Vector3::new(0.0, 0.0, 0.0);
        }
        self.max - self.min
    }

    pub fn max_dimension(&self) -> f32 {
        let e = self.extent();
        e.x.max(e.y).max(e.z)
    }

    /// Radius of the sphere enclosing the box.
    pub fn radius(&self) -> f32 {
        self.extent().magnitude() * 0.5
    }
}

//! STL triangle meshes.
//!
//! Binary layout: an 80 byte header, a little endian `u32` facet count, then
//! one 50 byte record per facet (normal, three vertices, `u16` attribute).
//! ASCII files (`solid ... endsolid`) are accepted as well. Every facet turns
//! into three unshared vertices; the facet normal is used for all of them.

use cgmath::InnerSpace;

use crate::{
    data_structures::{geometry::Geometry, material::Material, scene_graph::SceneNode},
    error::{RenderError, Result},
    resources::{DecodeReport, DecodedModel, ModelFormat},
};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;
const BODY_OFFSET: usize = HEADER_LEN + 4;

/// One facet as read from the file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Facet {
    pub normal: [f32; 3],
    pub vertices: [[f32; 3]; 3],
}

pub fn decode(bytes: &[u8]) -> Result<DecodedModel> {
    let facets = parse_facets(bytes)?;
    log::debug!("triangle mesh with {} facets", facets.len());
    let geometry = facets_to_geometry(&facets)?;
    let mut root = SceneNode::with_mesh(geometry, Material::mesh_default());
    root.name = Some("mesh".to_string());

    Ok(DecodedModel {
        format: ModelFormat::TriangleMesh,
        root,
        textures: Vec::new(),
        report: DecodeReport::default(),
    })
}

pub fn parse_facets(bytes: &[u8]) -> Result<Vec<Facet>> {
    let declared = declared_facets(bytes);
    let expected_len = declared.and_then(|n| n.checked_mul(FACET_LEN)?.checked_add(BODY_OFFSET));

    if expected_len == Some(bytes.len()) {
        return parse_binary(bytes, declared.unwrap_or(0));
    }
    if looks_like_ascii(bytes) {
        return parse_ascii(bytes);
    }
    match (declared, expected_len) {
        // Some exporters append trailing bytes after the last facet.
        (Some(n), Some(len)) if len <= bytes.len() => parse_binary(bytes, n),
        (Some(n), _) => Err(RenderError::Parse(format!(
            "binary STL declares {} facets but holds only {} bytes",
            n,
            bytes.len()
        ))),
        (None, _) => Err(RenderError::Parse(format!(
            "STL is too short ({} bytes) for a binary header",
            bytes.len()
        ))),
    }
}

fn declared_facets(bytes: &[u8]) -> Option<usize> {
    let raw = bytes.get(HEADER_LEN..BODY_OFFSET)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
}

fn looks_like_ascii(bytes: &[u8]) -> bool {
    let trimmed = bytes.trim_ascii_start();
    trimmed.starts_with(b"solid") && std::str::from_utf8(trimmed).is_ok_and(|s| s.is_ascii())
}

fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_vec3(bytes: &[u8], at: usize) -> [f32; 3] {
    [read_f32(bytes, at), read_f32(bytes, at + 4), read_f32(bytes, at + 8)]
}

fn parse_binary(bytes: &[u8], count: usize) -> Result<Vec<Facet>> {
    (0..count)
        .map(|i| {
            let at = BODY_OFFSET + i * FACET_LEN;
            Ok(Facet {
                normal: read_vec3(bytes, at),
                vertices: [
                    read_vec3(bytes, at + 12),
                    read_vec3(bytes, at + 24),
                    read_vec3(bytes, at + 36),
                ],
            })
        })
        .collect()
}

fn parse_ascii(bytes: &[u8]) -> Result<Vec<Facet>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| RenderError::Parse(format!("ASCII STL is not UTF-8: {}", e)))?;
    let mut tokens = text.split_whitespace();
    let mut facets = Vec::new();
    let mut normal = [0.0; 3];
    let mut vertices: Vec<[f32; 3]> = Vec::with_capacity(3);

    while let Some(token) = tokens.next() {
        match token {
            "facet" => {
                if tokens.next() != Some("normal") {
                    return Err(RenderError::Parse("expected 'normal' after 'facet'".to_string()));
                }
                normal = read_ascii_vec3(&mut tokens)?;
                vertices.clear();
            }
            "vertex" => vertices.push(read_ascii_vec3(&mut tokens)?),
            "endfacet" => {
                let [a, b, c] = vertices.as_slice() else {
                    return Err(RenderError::Parse(format!(
                        "facet {} has {} vertices, expected 3",
                        facets.len(),
                        vertices.len()
                    )));
                };
                facets.push(Facet {
                    normal,
                    vertices: [*a, *b, *c],
                });
            }
            // solid/outer/loop/endloop/endsolid and solid names carry no geometry
            _ => {}
        }
    }
    Ok(facets)
}

fn read_ascii_vec3<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<[f32; 3]> {
    let mut out = [0.0f32; 3];
    for v in &mut out {
        let token = tokens
            .next()
            .ok_or_else(|| RenderError::Parse("unexpected end of ASCII STL".to_string()))?;
        *v = token
            .parse()
            .map_err(|_| RenderError::Parse(format!("'{}' is not a number", token)))?;
    }
    Ok(out)
}

/// Flattens facets into one geometry, three fresh vertices per facet.
pub fn facets_to_geometry(facets: &[Facet]) -> Result<Geometry> {
    let mut positions = Vec::with_capacity(facets.len() * 3);
    let mut normals = Vec::with_capacity(facets.len() * 3);
    for facet in facets {
        let n = facet_normal(facet);
        for v in facet.vertices {
            positions.push(v);
            normals.push(n);
        }
    }
    let indices = (0..positions.len() as u32).collect();
    Geometry::new(positions, Some(normals), None, indices)
}

/// The stored normal when usable, the winding derived face normal otherwise.
fn facet_normal(facet: &Facet) -> [f32; 3] {
    let stored = cgmath::Vector3::from(facet.normal);
    if stored.magnitude2() > 1e-12 && stored.magnitude2().is_finite() {
        return stored.normalize().into();
    }
    let [a, b, c] = facet.vertices.map(cgmath::Vector3::from);
    let face = (b - a).cross(c - a);
    if face.magnitude2() > 0.0 {
        face.normalize().into()
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Serializes facets as a binary STL; used to author models in memory.
pub fn encode_binary(facets: &[Facet]) -> Vec<u8> {
    let mut out = Vec::with_capacity(BODY_OFFSET + facets.len() * FACET_LEN);
    out.extend_from_slice(&[0u8; HEADER_LEN]);
    out.extend_from_slice(&(facets.len() as u32).to_le_bytes());
    for facet in facets {
        for v in std::iter::once(&facet.normal).chain(facet.vertices.iter()) {
            for c in v {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

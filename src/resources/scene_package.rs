//! glTF 2.0 scene packages (`.gltf` with side buffers, or `.glb`).
//!
//! Decoding happens in four steps:
//! 1. parse the document and build the per-decode [`BlobStore`]
//! 2. resolve every buffer (GLB chunk, `blob:` id, `data:` uri or side file)
//! 3. decode every base colour image concurrently and wait for all of them
//! 4. mirror the node hierarchy of the default scene into [`SceneNode`]s
//!
//! A `blob:` image that cannot be resolved is recorded as
//! [`RenderError::MissingBlob`] and its material is left untextured.

use std::{borrow::Cow, collections::HashMap, path::Path, sync::Arc};

use crate::{
    data_structures::{
        geometry::Geometry,
        material::Material,
        scene_graph::{MeshPart, SceneNode},
        texture::{Texture, TextureSource},
        transform::Transform,
    },
    error::{RenderError, Result},
    resources::{
        AssetSource, DecodeReport, DecodedModel, ModelFormat,
        blob::BlobStore,
        uri::{self, UriRef},
    },
};

const GLB_MAGIC: &[u8; 4] = b"glTF";

pub async fn decode(
    bytes: &[u8],
    base_dir: &Path,
    source: &impl AssetSource,
) -> Result<DecodedModel> {
    let gltf = gltf::Gltf::from_slice(bytes)?;
    let mut report = DecodeReport::default();

    // Blob offsets point into the binary chunk of a GLB, or into the file itself.
    let (json, package): (Cow<[u8]>, Cow<[u8]>) = if bytes.starts_with(GLB_MAGIC) {
        let glb = gltf::Glb::from_slice(bytes)?;
        let package = glb.bin.unwrap_or(Cow::Borrowed(bytes));
        (glb.json, package)
    } else {
        (Cow::Borrowed(bytes), Cow::Borrowed(bytes))
    };
    let blobs = BlobStore::from_document(&json, &package);
    log::debug!("scene package declares {} resolvable blobs", blobs.len());

    let buffer_data = load_buffers(&gltf, &blobs, base_dir, source, &mut report).await?;
    check_views(&gltf, &buffer_data)?;
    check_accessors(&gltf)?;

    let textures = load_textures(&gltf, &buffer_data, &blobs, base_dir, source, &mut report).await;

    let mut root = SceneNode::new();
    root.name = Some("scene".to_string());
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    match scene {
        Some(scene) => {
            let mut ancestors = Vec::new();
            for node in scene.nodes() {
                let child = to_scene_node(&node, &buffer_data, &textures, &mut ancestors, &mut report)?;
                root.add_child(child);
            }
        }
        None => log::warn!("scene package contains no scene, nothing will be drawn"),
    }

    let mut decoded: Vec<(usize, Arc<Texture>)> = textures.into_iter().collect();
    decoded.sort_by_key(|(index, _)| *index);

    Ok(DecodedModel {
        format: ModelFormat::ScenePackage,
        root,
        textures: decoded.into_iter().map(|(_, tex)| tex).collect(),
        report,
    })
}

async fn load_buffers(
    gltf: &gltf::Gltf,
    blobs: &BlobStore,
    base_dir: &Path,
    source: &impl AssetSource,
    report: &mut DecodeReport,
) -> Result<Vec<Option<Vec<u8>>>> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => Some(
                gltf.blob
                    .clone()
                    .ok_or_else(|| RenderError::Parse("GLB binary chunk is missing".to_string()))?,
            ),
            gltf::buffer::Source::Uri(uri) => match uri::classify(uri) {
                UriRef::Blob(id) => match blobs.get(id) {
                    Some(bytes) => Some(bytes.to_vec()),
                    None => {
                        report.warn(RenderError::MissingBlob(id.to_string()));
                        None
                    }
                },
                UriRef::Data { payload, base64, .. } => Some(uri::decode_data(payload, base64)?),
                UriRef::Remote(uri) => {
                    return Err(RenderError::Parse(format!(
                        "buffer {} points to the network ({}), only local files are read",
                        buffer.index(),
                        uri
                    )));
                }
                UriRef::Relative(path) => {
                    let path = base_dir.join(path);
                    let bytes = source.read_bytes(&path).await.map_err(|e| {
                        RenderError::Parse(format!("buffer {} unavailable: {}", buffer.index(), e))
                    })?;
                    Some(bytes)
                }
            },
        };
        if let Some(bytes) = &data {
            if bytes.len() < buffer.length() {
                return Err(RenderError::Parse(format!(
                    "buffer {} holds {} bytes, {} declared",
                    buffer.index(),
                    bytes.len(),
                    buffer.length()
                )));
            }
        }
        buffer_data.push(data);
    }
    Ok(buffer_data)
}

/// Buffer views must lie inside their buffer, the accessor readers index without checks.
fn check_views(gltf: &gltf::Gltf, buffer_data: &[Option<Vec<u8>>]) -> Result<()> {
    for view in gltf.views() {
        let Some(data) = &buffer_data[view.buffer().index()] else {
            continue;
        };
        let end = view.offset().checked_add(view.length());
        if end.is_none_or(|end| end > data.len()) {
            return Err(RenderError::Parse(format!(
                "buffer view {} exceeds buffer {}",
                view.index(),
                view.buffer().index()
            )));
        }
    }
    Ok(())
}

/// Accessors must hold at least one element and fit their buffer view.
fn check_accessors(gltf: &gltf::Gltf) -> Result<()> {
    for accessor in gltf.accessors() {
        let count = accessor.count();
        if count == 0 {
            return Err(RenderError::Parse(format!(
                "accessor {} has no elements",
                accessor.index()
            )));
        }
        let Some(view) = accessor.view() else {
            continue;
        };
        let size = accessor.size();
        let stride = view.stride().unwrap_or(size);
        let end = stride
            .checked_mul(count - 1)
            .and_then(|span| span.checked_add(accessor.offset()))
            .and_then(|span| span.checked_add(size));
        if end.is_none_or(|end| end > view.length()) {
            return Err(RenderError::Parse(format!(
                "accessor {} reads past the end of buffer view {}",
                accessor.index(),
                view.index()
            )));
        }
    }
    Ok(())
}

/// Encoded bytes of one image, before decoding.
struct PendingImage {
    index: usize,
    source: TextureSource,
    mime_type: Option<String>,
    bytes: Vec<u8>,
}

/// Decodes every image used as a base colour map. Failures are recorded in
/// `report`; the returned map only holds fully decoded textures.
async fn load_textures(
    gltf: &gltf::Gltf,
    buffer_data: &[Option<Vec<u8>>],
    blobs: &BlobStore,
    base_dir: &Path,
    source: &impl AssetSource,
    report: &mut DecodeReport,
) -> HashMap<usize, Arc<Texture>> {
    let mut wanted: Vec<gltf::Image> = gltf
        .materials()
        .filter_map(|m| m.pbr_metallic_roughness().base_color_texture())
        .map(|info| info.texture().source())
        .collect();
    wanted.sort_by_key(|image| image.index());
    wanted.dedup_by_key(|image| image.index());

    let mut pending = Vec::new();
    for image in wanted {
        match image_bytes(&image, buffer_data, blobs, base_dir, source).await {
            Ok(p) => pending.push(p),
            // Already recorded when the buffer of the same id failed to resolve.
            Err(RenderError::MissingBlob(id))
                if report
                    .missing_blobs()
                    .any(|w| matches!(w, RenderError::MissingBlob(seen) if *seen == id)) =>
            {
                log::debug!("image {} uses unresolved blob {}", image.index(), id);
            }
            Err(e) => report.warn(e),
        }
    }

    let decodes = pending.into_iter().map(|p| async move {
        let index = p.index;
        let label = format!("image {}", index);
        let decoded = tokio::task::spawn_blocking(move || {
            Texture::from_bytes(p.source, &p.bytes, p.mime_type.as_deref())
        })
        .await;
        let texture = match decoded {
            Ok(result) => result,
            Err(join) => Err(RenderError::MissingTexture {
                uri: label,
                reason: join.to_string(),
            }),
        };
        (index, texture)
    });

    let mut textures = HashMap::new();
    for (index, texture) in futures::future::join_all(decodes).await {
        match texture {
            Ok(texture) => {
                log::debug!("image {} decoded ({}x{})", index, texture.width, texture.height);
                textures.insert(index, Arc::new(texture));
            }
            Err(e) => report.warn(e),
        }
    }
    textures
}

async fn image_bytes(
    image: &gltf::Image<'_>,
    buffer_data: &[Option<Vec<u8>>],
    blobs: &BlobStore,
    base_dir: &Path,
    source: &impl AssetSource,
) -> Result<PendingImage> {
    let index = image.index();
    match image.source() {
        gltf::image::Source::View { view, mime_type } => {
            let bytes = buffer_data[view.buffer().index()]
                .as_deref()
                .map(|data| data[view.offset()..view.offset() + view.length()].to_vec())
                .ok_or_else(|| RenderError::MissingTexture {
                    uri: format!("bufferView {}", view.index()),
                    reason: format!("buffer {} is unavailable", view.buffer().index()),
                })?;
            Ok(PendingImage {
                index,
                source: TextureSource::BufferView { view: view.index() },
                mime_type: Some(mime_type.to_string()),
                bytes,
            })
        }
        gltf::image::Source::Uri { uri, mime_type } => {
            let mime_type = mime_type.map(str::to_string);
            let (source_ref, bytes) = match uri::classify(uri) {
                UriRef::Blob(id) => {
                    let bytes = blobs
                        .get(id)
                        .ok_or_else(|| RenderError::MissingBlob(id.to_string()))?;
                    (TextureSource::Blob(id.to_string()), bytes.to_vec())
                }
                UriRef::Data {
                    payload, base64, ..
                } => {
                    let bytes = uri::decode_data(payload, base64).map_err(|e| {
                        RenderError::MissingTexture {
                            uri: "data uri".to_string(),
                            reason: e.to_string(),
                        }
                    })?;
                    (TextureSource::Inline, bytes)
                }
                UriRef::Remote(remote) => {
                    return Err(RenderError::MissingTexture {
                        uri: remote.to_string(),
                        reason: "network textures are not fetched".to_string(),
                    });
                }
                UriRef::Relative(path) => {
                    let path = base_dir.join(path);
                    let bytes = source.read_bytes(&path).await.map_err(|e| {
                        RenderError::MissingTexture {
                            uri: uri.to_string(),
                            reason: e.to_string(),
                        }
                    })?;
                    (TextureSource::External(path), bytes)
                }
            };
            Ok(PendingImage {
                index,
                source: source_ref,
                mime_type,
                bytes,
            })
        }
    }
}

fn to_material(material: &gltf::Material<'_>, textures: &HashMap<usize, Arc<Texture>>) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let texture = pbr
        .base_color_texture()
        .and_then(|info| textures.get(&info.texture().source().index()).cloned());
    Material {
        name: material.name().map(str::to_string),
        base_color: pbr.base_color_factor(),
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        texture,
    }
}

fn to_scene_node(
    node: &gltf::Node<'_>,
    buffer_data: &[Option<Vec<u8>>],
    textures: &HashMap<usize, Arc<Texture>>,
    ancestors: &mut Vec<usize>,
    report: &mut DecodeReport,
) -> Result<SceneNode> {
    if ancestors.contains(&node.index()) {
        return Err(RenderError::Parse(format!(
            "node {} is its own ancestor",
            node.index()
        )));
    }
    ancestors.push(node.index());

    let (position, rotation, scale) = node.transform().decomposed();
    let mut scene_node = SceneNode::new();
    scene_node.name = node.name().map(str::to_string);
    scene_node.transform = Transform::from_decomposed(position, rotation, scale);

    if let Some(mesh) = node.mesh() {
        let mut parts = Vec::new();
        for primitive in mesh.primitives() {
            if let Some(geometry) = to_geometry(&primitive, buffer_data)? {
                parts.push((geometry, to_material(&primitive.material(), textures)));
            } else {
                log::warn!(
                    "skipping primitive {} of mesh {:?}: unsupported mode or unavailable data",
                    primitive.index(),
                    mesh.name()
                );
            }
        }
        if parts.len() == 1 {
            let (geometry, material) = parts.remove(0);
            scene_node.mesh = Some(MeshPart { geometry, material });
        } else {
            for (geometry, material) in parts {
                scene_node.add_child(SceneNode::with_mesh(geometry, material));
            }
        }
    }

    for child in node.children() {
        let child = to_scene_node(&child, buffer_data, textures, ancestors, report)?;
        scene_node.add_child(child);
    }

    ancestors.pop();
    Ok(scene_node)
}

/// `Ok(None)` for primitives that cannot be drawn as triangles or whose data is unavailable.
fn to_geometry(
    primitive: &gltf::Primitive<'_>,
    buffer_data: &[Option<Vec<u8>>],
) -> Result<Option<Geometry>> {
    use gltf::mesh::Mode;

    let reader = primitive.reader(|buffer| buffer_data[buffer.index()].as_deref());
    let Some(positions) = reader.read_positions() else {
        return Ok(None);
    };
    let positions: Vec<[f32; 3]> = positions.collect();
    let normals: Option<Vec<[f32; 3]>> = reader
        .read_normals()
        .map(|n| n.collect::<Vec<_>>())
        .filter(|n| n.len() == positions.len());
    let tex_coords: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|t| t.into_f32().collect::<Vec<_>>())
        .filter(|t| t.len() == positions.len());
    let raw: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let indices = match primitive.mode() {
        Mode::Triangles => raw,
        Mode::TriangleStrip => strip_to_list(&raw),
        Mode::TriangleFan => fan_to_list(&raw),
        _ => return Ok(None),
    };
    Geometry::new(positions, normals, tex_coords, indices).map(Some)
}

fn strip_to_list(strip: &[u32]) -> Vec<u32> {
    strip
        .windows(3)
        .enumerate()
        .flat_map(|(i, w)| {
            if i % 2 == 0 {
                [w[0], w[1], w[2]]
            } else {
                [w[1], w[0], w[2]]
            }
        })
        .collect()
}

fn fan_to_list(fan: &[u32]) -> Vec<u32> {
    if fan.len() < 3 {
        return Vec::new();
    }
    fan[1..]
        .windows(2)
        .flat_map(|w| [fan[0], w[0], w[1]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_alternate_winding() {
        assert_eq!(strip_to_list(&[0, 1, 2, 3]), vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn fans_share_the_first_vertex() {
        assert_eq!(fan_to_list(&[0, 1, 2, 3]), vec![0, 1, 2, 0, 2, 3]);
        assert!(fan_to_list(&[0, 1]).is_empty());
    }
}

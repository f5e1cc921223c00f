#![allow(dead_code)]

use model_snap::resources::triangle_mesh::{Facet, encode_binary};
use serde_json::{Value, json};

/// Facets of an axis aligned cube of edge `2 * half` centred on the origin, 12 triangles.
pub fn cube_facets(half: f32) -> Vec<Facet> {
    let mut facets = Vec::with_capacity(12);
    for axis in 0..3 {
        let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
        for sign in [-1.0f32, 1.0] {
            let corner = |su: f32, sv: f32| {
                let mut p = [0.0; 3];
                p[axis] = sign * half;
                p[u] = su * half;
                p[v] = sv * half;
                p
            };
            let mut normal = [0.0; 3];
            normal[axis] = sign;
            facets.push(Facet {
                normal,
                vertices: [corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0)],
            });
            facets.push(Facet {
                normal,
                vertices: [corner(-1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0)],
            });
        }
    }
    facets
}

pub fn cube_stl() -> Vec<u8> {
    encode_binary(&cube_facets(0.5))
}

/// A 2x2 opaque red PNG.
pub fn red_png() -> Vec<u8> {
    red_png_sized(2, 2)
}

/// An opaque red PNG of the given size.
pub fn red_png_sized(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("PNG encoding of an in-memory image");
    out.into_inner()
}

/// How the base colour texture of [`triangle_scene`] is referenced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFixture {
    None,
    /// Image bytes in a buffer view of the binary chunk.
    BufferView,
    /// `blob:` image resolved through a blob buffer at a valid offset.
    Blob,
    /// `blob:` image whose blob buffer points past the end of the package.
    MissingBlob,
    /// Side file next to the model.
    External(&'static str),
}

fn pad4(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

/// A glTF document with one textured triangle used by two nodes: `parent`
/// at the origin and its `child` translated by +2 on Z. Returns the JSON
/// document and the bytes of buffer 0.
pub fn triangle_scene(texture: TextureFixture) -> (Value, Vec<u8>) {
    triangle_scene_with_image(texture, &red_png())
}

/// [`triangle_scene`] with `png` as the encoded base colour image.
pub fn triangle_scene_with_image(texture: TextureFixture, png: &[u8]) -> (Value, Vec<u8>) {
    let mut bin = Vec::new();
    for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        for c in p {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    for uv in [[0.0f32, 1.0], [1.0, 1.0], [0.0, 0.0]] {
        for c in uv {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    for i in [0u16, 1, 2] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    pad4(&mut bin, 0);

    let png_offset = bin.len();
    bin.extend_from_slice(png);
    pad4(&mut bin, 0);

    let mut doc = json!({
        "asset": {"version": "2.0", "generator": "model-snap tests"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [
            {"name": "parent", "mesh": 0, "children": [1]},
            {"name": "child", "mesh": 0, "translation": [0.0, 0.0, 2.0]}
        ],
        "meshes": [{
            "primitives": [{
                "attributes": {"POSITION": 0, "TEXCOORD_0": 1},
                "indices": 2,
                "material": 0
            }]
        }],
        "materials": [{
            "name": "painted",
            "pbrMetallicRoughness": {
                "baseColorFactor": [1.0, 1.0, 1.0, 1.0],
                "metallicFactor": 0.1,
                "roughnessFactor": 0.9
            }
        }],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
             "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
            {"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2"},
            {"bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 24},
            {"buffer": 0, "byteOffset": 60, "byteLength": 6}
        ],
        "buffers": [{"byteLength": bin.len()}]
    });

    let image = match texture {
        TextureFixture::None => None,
        TextureFixture::BufferView => {
            doc["bufferViews"]
                .as_array_mut()
                .expect("bufferViews is an array")
                .push(json!({"buffer": 0, "byteOffset": png_offset, "byteLength": png.len()}));
            Some(json!({"bufferView": 3, "mimeType": "image/png"}))
        }
        TextureFixture::Blob | TextureFixture::MissingBlob => {
            let offset = if texture == TextureFixture::Blob {
                png_offset
            } else {
                bin.len() + 1024
            };
            doc["buffers"]
                .as_array_mut()
                .expect("buffers is an array")
                .push(json!({"uri": "blob:nodedata:tex0", "byteOffset": offset, "byteLength": png.len()}));
            Some(json!({"uri": "blob:nodedata:tex0", "mimeType": "image/png"}))
        }
        TextureFixture::External(name) => Some(json!({"uri": name})),
    };
    if let Some(image) = image {
        doc["images"] = json!([image]);
        doc["textures"] = json!([{"source": 0}]);
        doc["materials"][0]["pbrMetallicRoughness"]["baseColorTexture"] = json!({"index": 0});
    }
    (doc, bin)
}

/// Packs a document and its binary chunk into a GLB container.
pub fn to_glb(doc: &Value, bin: &[u8]) -> Vec<u8> {
    let mut json_chunk = serde_json::to_vec(doc).expect("serializable document");
    pad4(&mut json_chunk, b' ');
    let mut bin_chunk = bin.to_vec();
    pad4(&mut bin_chunk, 0);

    let total = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json_chunk);
    out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin_chunk);
    out
}

pub fn triangle_glb(texture: TextureFixture) -> Vec<u8> {
    let (doc, bin) = triangle_scene(texture);
    to_glb(&doc, &bin)
}

/// The same scene as a `.gltf` document whose buffer 0 is the side file `side_file`.
pub fn triangle_gltf(texture: TextureFixture, side_file: &str) -> (Vec<u8>, Vec<u8>) {
    let (mut doc, bin) = triangle_scene(texture);
    doc["buffers"][0]["uri"] = json!(side_file);
    (serde_json::to_vec(&doc).expect("serializable document"), bin)
}

/// A scene package without any mesh.
pub fn empty_gltf() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"name": "empty"}]
    }))
    .expect("serializable document")
}

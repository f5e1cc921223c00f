use std::path::Path;

use common::test_utils::{
    TextureFixture, cube_stl, empty_gltf, to_glb, triangle_glb, triangle_gltf, triangle_scene,
};
use model_snap::{
    ErrorKind,
    resources::{MemorySource, ModelFormat, load_model},
    scene,
};

mod common;

fn source_with(path: &str, bytes: Vec<u8>) -> MemorySource {
    let mut source = MemorySource::new();
    source.insert(path, bytes);
    source
}

#[tokio::test]
async fn stl_cube_decodes_to_twelve_triangles() {
    let source = source_with("models/cube.stl", cube_stl());
    let model = load_model(Path::new("models/cube.stl"), &source).await.unwrap();

    assert_eq!(model.format, ModelFormat::TriangleMesh);
    assert_eq!(model.root.mesh_count(), 1);
    assert_eq!(model.root.triangle_count(), 12);
    assert!(model.report.warnings.is_empty());

    let bounds = model.root.world_bounds();
    assert_eq!(bounds.max_dimension(), 1.0);
}

#[tokio::test]
async fn extension_is_matched_case_insensitively() {
    let source = source_with("CUBE.STL", cube_stl());
    let model = load_model(Path::new("CUBE.STL"), &source).await.unwrap();
    assert_eq!(model.format, ModelFormat::TriangleMesh);
}

#[tokio::test]
async fn unsupported_extension_fails_before_reading() {
    // The source is empty: reading would fail with an IO error instead.
    let err = load_model(Path::new("cube.obj"), &MemorySource::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[tokio::test]
async fn glb_mirrors_the_node_hierarchy() {
    let source = source_with("tri.glb", triangle_glb(TextureFixture::None));
    let model = load_model(Path::new("tri.glb"), &source).await.unwrap();

    assert_eq!(model.format, ModelFormat::ScenePackage);
    let parent = &model.root.children[0];
    assert_eq!(parent.name.as_deref(), Some("parent"));
    assert_eq!(parent.children[0].name.as_deref(), Some("child"));
    assert_eq!(model.root.mesh_count(), 2);

    let bounds = model.root.world_bounds();
    assert_eq!(bounds.min.z, 0.0);
    assert_eq!(bounds.max.z, 2.0);

    let material = &parent.mesh.as_ref().unwrap().material;
    assert_eq!(material.name.as_deref(), Some("painted"));
    assert!((material.metalness - 0.1).abs() < 1e-6);
    assert!((material.roughness - 0.9).abs() < 1e-6);
    assert!(material.texture.is_none());
}

#[tokio::test]
async fn buffer_view_textures_are_decoded_before_returning() {
    let source = source_with("tri.glb", triangle_glb(TextureFixture::BufferView));
    let model = load_model(Path::new("tri.glb"), &source).await.unwrap();

    assert!(model.report.warnings.is_empty());
    assert_eq!(model.textures.len(), 1);
    for material in model.root.materials() {
        let texture = material.texture.as_ref().expect("texture resolved");
        assert_eq!((texture.width, texture.height), (2, 2));
        assert_eq!(&texture.rgba[..4], &[255, 0, 0, 255]);
    }
}

#[tokio::test]
async fn blob_references_resolve_from_the_package() {
    let source = source_with("tri.glb", triangle_glb(TextureFixture::Blob));
    let model = load_model(Path::new("tri.glb"), &source).await.unwrap();

    assert!(model.report.warnings.is_empty());
    let texture = model.root.materials()[0].texture.clone().expect("blob texture");
    assert_eq!(texture.width, 2);
}

#[tokio::test]
async fn missing_blob_leaves_the_material_untextured() {
    let source = source_with("tri.glb", triangle_glb(TextureFixture::MissingBlob));
    let model = load_model(Path::new("tri.glb"), &source).await.unwrap();

    assert_eq!(model.report.missing_blobs().count(), 1);
    assert_eq!(model.report.warnings.len(), 1);
    assert!(model.report.warnings.iter().all(|w| !w.is_fatal()));
    assert!(model.root.materials().iter().all(|m| m.texture.is_none()));
    assert_eq!(model.root.triangle_count(), 2);
}

#[tokio::test]
async fn side_buffers_are_read_through_the_source() {
    let (json, bin) = triangle_gltf(TextureFixture::External("wood.png"), "mesh%20data.bin");
    let mut source = source_with("assets/tri.gltf", json);
    source.insert("assets/mesh data.bin", bin);

    let model = load_model(Path::new("assets/tri.gltf"), &source).await.unwrap();

    assert_eq!(model.root.triangle_count(), 2);
    let kinds: Vec<_> = model.report.warnings.iter().map(|w| w.kind()).collect();
    assert_eq!(kinds, vec![ErrorKind::MissingTexture]);
}

#[tokio::test]
async fn missing_side_buffer_is_a_parse_error() {
    let (json, _) = triangle_gltf(TextureFixture::None, "gone.bin");
    let source = source_with("tri.gltf", json);
    let err = load_model(Path::new("tri.gltf"), &source).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn malformed_accessors_are_parse_errors() {
    // No elements, and more elements than the 36 byte position view holds.
    for count in [0, 4] {
        let (mut doc, bin) = triangle_scene(TextureFixture::None);
        doc["accessors"][0]["count"] = serde_json::json!(count);
        let source = source_with("tri.glb", to_glb(&doc, &bin));

        let err = load_model(Path::new("tri.glb"), &source).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse, "count {}", count);
    }
}

#[tokio::test]
async fn accessor_offsets_are_bounds_checked() {
    let (mut doc, bin) = triangle_scene(TextureFixture::None);
    doc["accessors"][2]["byteOffset"] = serde_json::json!(2);
    let source = source_with("tri.glb", to_glb(&doc, &bin));

    let err = load_model(Path::new("tri.glb"), &source).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn garbage_is_a_parse_error() {
    for name in ["junk.glb", "junk.stl"] {
        let source = source_with(name, b"definitely not a model".to_vec());
        let err = load_model(Path::new(name), &source).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse, "{}", name);
    }
}

#[tokio::test]
async fn empty_scene_assembles_with_the_full_rig() {
    let source = source_with("empty.gltf", empty_gltf());
    let model = load_model(Path::new("empty.gltf"), &source).await.unwrap();
    assert_eq!(model.root.mesh_count(), 0);

    let assembled = scene::assemble(model);
    assert_eq!(assembled.lights.len(), 3);
    assert!(assembled.bounds().is_empty());
}

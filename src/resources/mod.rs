//! Model decoding: turns model files into a [`SceneNode`] tree.
//!
//! Two container formats are understood, picked by file extension:
//!
//! - `.stl` triangle meshes (binary or ASCII), see [`triangle_mesh`]
//! - `.gltf` / `.glb` scene packages, see [`scene_package`]
//!
//! All file access goes through an [`AssetSource`], so the decoders never
//! touch the filesystem (or anything else) directly. Embedded data is resolved
//! from the package bytes through a per-decode [`blob::BlobStore`].

use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    data_structures::{scene_graph::SceneNode, texture::Texture},
    error::{RenderError, Result},
};

pub mod blob;
pub mod scene_package;
pub mod triangle_mesh;
mod uri;

/// Container formats the decoder understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    /// STL, geometry only.
    TriangleMesh,
    /// glTF 2.0, either JSON (`.gltf`) with side buffers or binary (`.glb`).
    ScenePackage,
}

impl ModelFormat {
    /// Picks the format from the (case insensitive) file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "stl" => Ok(ModelFormat::TriangleMesh),
            "gltf" | "glb" => Ok(ModelFormat::ScenePackage),
            "" => Err(RenderError::UnsupportedFormat(path.display().to_string())),
            other => Err(RenderError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

/// The single capability the decoders need from the outside world: read all
/// bytes at a path.
pub trait AssetSource: Sync {
    fn read_bytes(&self, path: &Path) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Reads assets from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsSource;

impl AssetSource for FsSource {
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// In-memory assets keyed by path, handy for embedding and tests.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }
}

impl AssetSource for MemorySource {
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| RenderError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

/// Non-fatal problems met while decoding.
#[derive(Debug, Default)]
pub struct DecodeReport {
    pub warnings: Vec<RenderError>,
}

impl DecodeReport {
    pub(crate) fn warn(&mut self, warning: RenderError) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn missing_blobs(&self) -> impl Iterator<Item = &RenderError> {
        self.warnings
            .iter()
            .filter(|w| w.kind() == crate::error::ErrorKind::MissingBlob)
    }
}

/// Output of the decoder: the untouched model tree and everything resolved for it.
#[derive(Debug)]
pub struct DecodedModel {
    pub format: ModelFormat,
    pub root: SceneNode,
    /// Every texture that was decoded, shared with the materials using it.
    pub textures: Vec<Arc<Texture>>,
    pub report: DecodeReport,
}

/// Decodes `bytes` of the given format.
///
/// `base_dir` is where relative references (side buffers, external images)
/// are resolved. Returns only after every texture is decoded or recorded as
/// missing.
pub async fn decode_model(
    bytes: &[u8],
    format: ModelFormat,
    base_dir: &Path,
    source: &impl AssetSource,
) -> Result<DecodedModel> {
    match format {
        ModelFormat::TriangleMesh => triangle_mesh::decode(bytes),
        ModelFormat::ScenePackage => scene_package::decode(bytes, base_dir, source).await,
    }
}

/// Detects the format of `path`, reads it through `source` and decodes it.
///
/// Unsupported extensions fail before any bytes are read.
pub async fn load_model(path: &Path, source: &impl AssetSource) -> Result<DecodedModel> {
    let format = ModelFormat::from_path(path)?;
    let bytes = source.read_bytes(path).await?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    log::info!(
        "decoding {} ({} bytes) as {:?}",
        path.display(),
        bytes.len(),
        format
    );
    decode_model(&bytes, format, base_dir, source).await
}

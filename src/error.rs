//! Error taxonomy shared by every stage of the snapshot pipeline.
//!
//! All failures are reported through [`RenderError`]. Callers that need to
//! branch on the failure (exit codes, tests, the decode report) use
//! [`RenderError::kind`] instead of matching on message text.

use std::path::PathBuf;

use thiserror::Error;

/// Discriminant of a [`RenderError`], cheap to compare and print.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArguments,
    InvalidDimensions,
    FileNotFound,
    UnsupportedFormat,
    Parse,
    ContextCreation,
    MissingBlob,
    MissingTexture,
    Io,
    Gpu,
    Encode,
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("dimensions must be in the format widthxheight, e.g. 800x600 (got '{0}')")]
    InvalidDimensions(String),

    #[error("model file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("unsupported file format '{0}', use STL or glTF/GLB")]
    UnsupportedFormat(String),

    #[error("failed to parse model: {0}")]
    Parse(String),

    #[error("failed to create the off-screen graphics context: {0}")]
    ContextCreation(String),

    /// An internal `blob:` reference had no backing bytes in the package.
    #[error("blob data not found for '{0}'")]
    MissingBlob(String),

    /// An external or inline texture could not be read or decoded.
    #[error("texture '{uri}' could not be loaded: {reason}")]
    MissingTexture { uri: String, reason: String },

    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::InvalidArguments(_) => ErrorKind::InvalidArguments,
            RenderError::InvalidDimensions(_) => ErrorKind::InvalidDimensions,
            RenderError::FileNotFound(_) => ErrorKind::FileNotFound,
            RenderError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            RenderError::Parse(_) => ErrorKind::Parse,
            RenderError::ContextCreation(_) => ErrorKind::ContextCreation,
            RenderError::MissingBlob(_) => ErrorKind::MissingBlob,
            RenderError::MissingTexture { .. } => ErrorKind::MissingTexture,
            RenderError::Io { .. } => ErrorKind::Io,
            RenderError::Gpu(_) => ErrorKind::Gpu,
            RenderError::Encode(_) => ErrorKind::Encode,
        }
    }

    /// Fatal errors abort the pipeline. Missing textures only degrade the
    /// affected material.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::MissingBlob | ErrorKind::MissingTexture
        )
    }
}

impl From<gltf::Error> for RenderError {
    fn from(e: gltf::Error) -> Self {
        RenderError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

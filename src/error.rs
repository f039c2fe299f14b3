//! Error types shared by the whole generation pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can abort icon generation.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading, writing or stat-ing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input image violates one of the source art constraints.
    #[error("invalid input image {}: {kind}", path.display())]
    Validation {
        path: PathBuf,
        #[source]
        kind: ValidationError,
    },

    /// usvg could not build a render tree from the document.
    #[error("failed to parse SVG: {0}")]
    Svg(#[from] resvg::usvg::Error),

    /// The document is not well-formed XML.
    #[error("parsing SVG failed: {0}")]
    SvgSyntax(#[from] roxmltree::Error),

    /// The requested raster has a zero dimension.
    #[error("cannot allocate a {width}x{height} raster")]
    EmptyRaster { width: u32, height: u32 },

    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No asset catalog could be located for the iOS output.
    #[error("No Images.xcassets found under {}/ subdirectories", dir.display())]
    IconsetNotFound { dir: PathBuf },

    #[error("Icon is required, but not found at {}", path.display())]
    ForegroundNotFound { path: PathBuf },

    #[error("Unsupported platform {0}")]
    UnsupportedPlatform(String),

    /// A blocking render task panicked or was cancelled.
    #[error("render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A memoized failure handed out again to a later reader.
    #[error(transparent)]
    Shared(Arc<Error>),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the validation failure behind this error, looking through
    /// memoized failures.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation { kind, .. } => Some(kind),
            Self::Shared(inner) => inner.validation(),
            _ => None,
        }
    }
}

/// Constraint violated by a source image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "Unsupported image format {}. Only SVG images are supported.",
        .0.as_deref().unwrap_or("undefined")
    )]
    UnsupportedFormat(Option<String>),

    #[error("Unsupported image, missing size and density")]
    MissingDimensions,

    #[error("Input image not square ({width}x{height})")]
    NotSquare { width: u32, height: u32 },

    #[error("Input image size not 108x108 ({width}x{height})")]
    WrongSize { width: u32, height: u32 },

    #[error("Background image needs to be opaque")]
    NotOpaque,
}

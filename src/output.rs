//! Incremental file output.
//!
//! Rendered images are only regenerated when their sources are newer than the
//! file on disk. Text manifests are compared by content instead. Either check
//! is bypassed with `force`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::debug;

use crate::error::{Error, Result};
use crate::input::Input;
use crate::render::{self, RenderSource};

/// Paths of the files written by a generation step, in production order.
pub type PathStream = BoxStream<'static, Result<PathBuf>>;

/// A PNG file to produce from a [`RenderSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    pub path: PathBuf,
    /// Width and height in pixels.
    pub size: u32,
    /// Write an RGB image without an alpha channel.
    pub remove_alpha: bool,
}

impl RenderTarget {
    pub fn new(path: impl Into<PathBuf>, size: u32) -> Self {
        Self {
            path: path.into(),
            size,
            remove_alpha: false,
        }
    }

    pub fn without_alpha(mut self) -> Self {
        self.remove_alpha = true;
        self
    }
}

/// Whether the file at `path` is missing or older than `source_modified`.
pub async fn is_stale(path: &Path, source_modified: SystemTime) -> Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            let modified = metadata.modified().map_err(|err| Error::io(path, err))?;
            Ok(source_modified > modified)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(err) => Err(Error::io(path, err)),
    }
}

async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| Error::io(parent, err))?;
    }
    tokio::fs::write(path, data)
        .await
        .map_err(|err| Error::io(path, err))
}

// ============================================================================
// Images
// ============================================================================

/// Renders one target unless it is up to date. Returns the path if written.
pub async fn render_png(
    input: &Input<RenderSource>,
    target: RenderTarget,
    force: bool,
) -> Result<Option<PathBuf>> {
    if !force && !is_stale(&target.path, input.last_modified()).await? {
        debug!("{} is up to date", target.path.display());
        return Ok(None);
    }

    let source = input.read().await?;
    let RenderTarget {
        path,
        size,
        remove_alpha,
    } = target;

    let png =
        tokio::task::spawn_blocking(move || render::render_png(&source, size, remove_alpha))
            .await??;
    write_file(&path, &png).await?;
    debug!("Wrote {}", path.display());

    Ok(Some(path))
}

/// Renders every target in order, yielding the paths actually written.
pub fn render_all(
    input: Input<RenderSource>,
    targets: Vec<RenderTarget>,
    force: bool,
) -> PathStream {
    stream::iter(targets)
        .then(move |target| {
            let input = input.clone();
            async move { render_png(&input, target, force).await }
        })
        .try_filter_map(future::ok)
        .boxed()
}

// ============================================================================
// Manifests
// ============================================================================

/// Contents of a generated text file.
#[derive(Debug, Clone, PartialEq)]
pub enum Contents {
    Text(String),
    /// Serialized pretty-printed with two-space indentation.
    Json(serde_json::Value),
}

impl Contents {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Text(text) => Ok(text.clone().into_bytes()),
            Self::Json(value) => Ok(serde_json::to_vec_pretty(value)?),
        }
    }
}

/// Writes `contents` to `path` unless the file already holds exactly that.
pub async fn ensure_file_contents(
    path: PathBuf,
    contents: Contents,
    force: bool,
) -> Result<Option<PathBuf>> {
    let data = contents.to_bytes()?;

    if !force {
        match tokio::fs::read(&path).await {
            Ok(existing) if existing == data => {
                debug!("{} is up to date", path.display());
                return Ok(None);
            }
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(Error::io(path, err)),
        }
    }

    write_file(&path, &data).await?;
    debug!("Wrote {}", path.display());

    Ok(Some(path))
}

/// [`ensure_file_contents`] as a stream of zero or one written path.
pub fn ensure_file(path: PathBuf, contents: Contents, force: bool) -> PathStream {
    stream::once(ensure_file_contents(path, contents, force))
        .try_filter_map(future::ok)
        .boxed()
}

// ============================================================================
// Tests
// ============================================================================

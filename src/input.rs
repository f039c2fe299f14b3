//! Icon source loading and the lazily decoded [`Input`] handle.
//!
//! Source art is two square SVG documents on a fixed 108×108 canvas: an
//! opaque background and a foreground drawn over it. Loading is split in two
//! steps so that up-to-date outputs can be skipped without decoding anything:
//!
//! 1. [`read_icon`] stats the files and returns an [`Input`] carrying the
//!    latest modification time.
//! 2. [`Input::read`] decodes and validates on first use, exactly once.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use futures::future::{BoxFuture, FutureExt};
use resvg::usvg;
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::{Error, Result, ValidationError};
use crate::render::{is_opaque, rasterize};
use crate::svg::{SVG_DENSITY, parse_tree};

/// Width and height every source image must have.
pub const INPUT_IMAGE_SIZE: u32 = 108;

/// Side of the centered region that is guaranteed to be visible.
pub const INPUT_CONTENT_SIZE: u32 = 72;

/// Distance from the canvas edge to the content region.
pub const INPUT_IMAGE_MARGIN: u32 = (INPUT_IMAGE_SIZE - INPUT_CONTENT_SIZE) / 2;

const DEFAULT_BACKGROUND: &[u8] = include_bytes!("../assets/default-icon-background.svg");

// ============================================================================
// Decoded data
// ============================================================================

/// Format tag of a decoded source. Only SVG is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
}

/// Intrinsic size and rendering density of a decoded source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMetadata {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub density: f64,
}

impl ImageMetadata {
    /// Metadata of an SVG document decoded at [`SVG_DENSITY`].
    pub fn svg(width: u32, height: u32) -> Self {
        Self {
            format: ImageFormat::Svg,
            width,
            height,
            density: SVG_DENSITY,
        }
    }
}

/// Pixel statistics gathered while validating a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageStats {
    /// No pixel has an alpha value below 255.
    pub is_opaque: bool,
}

/// A validated source image.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Raw SVG document bytes, as read from disk.
    pub data: Arc<[u8]>,
    pub metadata: ImageMetadata,
    pub stats: ImageStats,
}

impl SourceImage {
    /// The document as text. Sources are validated as UTF-8 on load.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Both layers of the icon. The background is guaranteed to be opaque.
#[derive(Debug, Clone)]
pub struct IconData {
    pub background: SourceImage,
    pub foreground: SourceImage,
}

// ============================================================================
// Input
// ============================================================================

type Loader<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

struct Inner<T> {
    cell: OnceCell<Result<Arc<T>, Arc<Error>>>,
    load: Loader<T>,
}

/// A deferred, memoized data source.
///
/// `last_modified` is known up front. The data itself is produced by the
/// first call to [`read`](Self::read); every later or concurrent call shares
/// that single result, including a failure.
pub struct Input<T> {
    last_modified: SystemTime,
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Input<T> {
    fn clone(&self) -> Self {
        Self {
            last_modified: self.last_modified,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> Input<T> {
    /// Creates a handle whose data is produced by `load`.
    pub fn from_fn<F, Fut>(last_modified: SystemTime, load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            last_modified,
            inner: Arc::new(Inner {
                cell: OnceCell::new(),
                load: Box::new(move || load().boxed()),
            }),
        }
    }

    /// Latest modification time of the files this data derives from.
    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    /// Returns the data, producing it on the first call.
    pub async fn read(&self) -> Result<Arc<T>> {
        let result = self
            .inner
            .cell
            .get_or_init(|| async {
                (self.inner.load)()
                    .await
                    .map(Arc::new)
                    .map_err(Arc::new)
            })
            .await;

        result.clone().map_err(Error::Shared)
    }

    /// A view of this input through `f`, sharing its decode and modification
    /// time.
    pub fn map<U, F>(&self, f: F) -> Input<U>
    where
        U: Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.try_map(move |data| Ok(f(data)))
    }

    /// Like [`map`](Self::map), for derivations that can fail.
    pub fn try_map<U, F>(&self, f: F) -> Input<U>
    where
        U: Send + Sync + 'static,
        F: Fn(&T) -> Result<U> + Send + Sync + 'static,
    {
        let parent = self.clone();
        let f = Arc::new(f);
        Input::from_fn(self.last_modified, move || {
            let parent = parent.clone();
            let f = Arc::clone(&f);
            async move {
                let data = parent.read().await?;
                f(&data)
            }
        })
    }
}

/// The handle produced by [`read_icon`].
pub type IconInput = Input<IconData>;

// ============================================================================
// Loading
// ============================================================================

/// Where the background layer comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundSource {
    /// The plain white background shipped with the crate.
    Bundled,
    File(PathBuf),
}

impl BackgroundSource {
    fn label(&self) -> PathBuf {
        match self {
            Self::Bundled => PathBuf::from("<default background>"),
            Self::File(path) => path.clone(),
        }
    }

    async fn modified(&self) -> Result<SystemTime> {
        match self {
            Self::Bundled => Ok(SystemTime::UNIX_EPOCH),
            Self::File(path) => modified(path).await,
        }
    }

    async fn read(&self) -> Result<Vec<u8>> {
        match self {
            Self::Bundled => Ok(DEFAULT_BACKGROUND.to_vec()),
            Self::File(path) => read_file(path).await,
        }
    }
}

/// Locations of the source art.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconConfig {
    /// Falls back to [`BackgroundSource::Bundled`] when unset.
    pub background_path: Option<PathBuf>,
    pub foreground_path: PathBuf,
}

impl IconConfig {
    fn background(&self) -> BackgroundSource {
        match &self.background_path {
            Some(path) => BackgroundSource::File(path.clone()),
            None => BackgroundSource::Bundled,
        }
    }
}

/// Stats the source files and returns a handle that decodes them on demand.
pub async fn read_icon(config: &IconConfig) -> Result<IconInput> {
    let background = config.background();
    let foreground = config.foreground_path.clone();

    let (background_modified, foreground_modified) =
        tokio::try_join!(background.modified(), modified(&foreground))?;
    let last_modified = background_modified.max(foreground_modified);

    Ok(Input::from_fn(last_modified, move || {
        load_data(background.clone(), foreground.clone())
    }))
}

async fn load_data(background: BackgroundSource, foreground: PathBuf) -> Result<IconData> {
    if let BackgroundSource::File(path) = &background {
        info!("Reading background file {}", path.display());
    }
    info!("Reading file {}", foreground.display());

    let (background_data, foreground_data) =
        tokio::try_join!(background.read(), read_file(&foreground))?;

    let background_label = background.label();
    tokio::task::spawn_blocking(move || {
        let background = decode_image(&background_label, &background_data)?;
        let foreground = decode_image(&foreground, &foreground_data)?;
        Ok(IconData {
            background: validate_background(background, &background_label)?,
            foreground,
        })
    })
    .await?
}

async fn modified(path: &Path) -> Result<SystemTime> {
    tokio::fs::metadata(path)
        .await
        .and_then(|metadata| metadata.modified())
        .map_err(|err| Error::io(path, err))
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|err| Error::io(path, err))
}

// ============================================================================
// Validation
// ============================================================================

fn invalid(path: &Path, kind: ValidationError) -> Error {
    Error::Validation {
        path: path.to_path_buf(),
        kind,
    }
}

/// Decodes and validates one source file.
pub fn decode_image(path: &Path, data: &[u8]) -> Result<SourceImage> {
    if let Ok(format) = image::guess_format(data) {
        let name = format.extensions_str().first().map(|ext| ext.to_string());
        return Err(invalid(path, ValidationError::UnsupportedFormat(name)));
    }

    let text = std::str::from_utf8(data)
        .map_err(|_| invalid(path, ValidationError::UnsupportedFormat(None)))?;
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let document = roxmltree::Document::parse_with_options(text, options)
        .map_err(|_| invalid(path, ValidationError::UnsupportedFormat(None)))?;

    let root = document.root_element();
    if root.tag_name().name() != "svg" {
        return Err(invalid(path, ValidationError::UnsupportedFormat(None)));
    }
    let has_size = root.has_attribute("width") && root.has_attribute("height");
    if !has_size && !root.has_attribute("viewBox") {
        return Err(invalid(path, ValidationError::MissingDimensions));
    }

    let tree = match parse_tree(data) {
        Ok(tree) => tree,
        Err(Error::Svg(usvg::Error::InvalidSize)) => {
            return Err(invalid(path, ValidationError::MissingDimensions));
        }
        Err(err) => return Err(err),
    };

    let width = tree.size().width().round() as u32;
    let height = tree.size().height().round() as u32;
    if width != height {
        return Err(invalid(path, ValidationError::NotSquare { width, height }));
    }
    if width != INPUT_IMAGE_SIZE {
        return Err(invalid(path, ValidationError::WrongSize { width, height }));
    }

    let pixmap = rasterize(data, 1.0)?;

    Ok(SourceImage {
        data: Arc::from(data),
        metadata: ImageMetadata::svg(width, height),
        stats: ImageStats {
            is_opaque: is_opaque(&pixmap),
        },
    })
}

fn validate_background(image: SourceImage, path: &Path) -> Result<SourceImage> {
    if image.stats.is_opaque {
        Ok(image)
    } else {
        Err(invalid(path, ValidationError::NotOpaque))
    }
}

// ============================================================================
// Tests
// ============================================================================

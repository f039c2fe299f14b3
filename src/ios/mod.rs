//! iOS app icon set: fully opaque PNGs for every idiom and scale, plus the
//! `Contents.json` manifest describing them.

pub mod config;

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;

use crate::error::Result;
use crate::input::{INPUT_CONTENT_SIZE, INPUT_IMAGE_MARGIN, IconInput, ImageMetadata};
use crate::output::{Contents, PathStream, RenderTarget, ensure_file, render_all};
use crate::render::RenderSource;
use crate::svg::prepare_for_inlining;

pub use config::{IosConfig, IosOptions};

/// One entry of the app icon set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IosIcon {
    pub idiom: &'static str,
    /// Nominal size in points.
    pub size: f64,
    pub scale: u32,
}

impl IosIcon {
    const fn new(idiom: &'static str, scale: u32, size: f64) -> Self {
        Self { idiom, size, scale }
    }

    /// `{idiom}-{size}@{scale}x.png`
    pub fn file_name(&self) -> String {
        format!("{}-{}@{}x.png", self.idiom, self.size, self.scale)
    }

    pub fn pixels(&self) -> u32 {
        (self.size * self.scale as f64).round() as u32
    }
}

pub const IOS_ICONS: [IosIcon; 18] = [
    IosIcon::new("iphone", 2, 20.0),
    IosIcon::new("iphone", 3, 20.0),
    IosIcon::new("iphone", 2, 29.0),
    IosIcon::new("iphone", 3, 29.0),
    IosIcon::new("iphone", 2, 40.0),
    IosIcon::new("iphone", 3, 40.0),
    IosIcon::new("iphone", 2, 60.0),
    IosIcon::new("iphone", 3, 60.0),
    IosIcon::new("ipad", 1, 20.0),
    IosIcon::new("ipad", 2, 20.0),
    IosIcon::new("ipad", 1, 29.0),
    IosIcon::new("ipad", 2, 29.0),
    IosIcon::new("ipad", 1, 40.0),
    IosIcon::new("ipad", 2, 40.0),
    IosIcon::new("ipad", 1, 76.0),
    IosIcon::new("ipad", 2, 76.0),
    IosIcon::new("ipad", 2, 83.5),
    IosIcon::new("ios-marketing", 1, 1024.0),
];

const MANIFEST_AUTHOR: &str = "react-native-svg-app-icon";

#[derive(Debug, Serialize)]
struct Manifest {
    images: Vec<ManifestImage>,
    info: ManifestInfo,
}

#[derive(Debug, Serialize)]
struct ManifestImage {
    filename: String,
    idiom: &'static str,
    scale: String,
    size: String,
}

#[derive(Debug, Serialize)]
struct ManifestInfo {
    author: &'static str,
    version: u32,
}

/// The `Contents.json` document for [`IOS_ICONS`].
pub fn manifest() -> Result<serde_json::Value> {
    let manifest = Manifest {
        images: IOS_ICONS
            .iter()
            .map(|icon| ManifestImage {
                filename: icon.file_name(),
                idiom: icon.idiom,
                scale: format!("{}x", icon.scale),
                size: format!("{0}x{0}", icon.size),
            })
            .collect(),
        info: ManifestInfo {
            author: MANIFEST_AUTHOR,
            version: 1,
        },
    };
    Ok(serde_json::to_value(manifest)?)
}

/// Inlines both layers into a document showing only the content region.
pub fn icon_svg(background: &str, foreground: &str) -> Result<String> {
    let margin = INPUT_IMAGE_MARGIN;
    let content = INPUT_CONTENT_SIZE;
    let background = prepare_for_inlining(background, "background")?;
    let foreground = prepare_for_inlining(foreground, "foreground")?;

    Ok(format!(
        r#"<svg version="1.1" xmlns="http://www.w3.org/2000/svg"
  viewBox="{margin} {margin} {content} {content}"
  width="{content}" height="{content}">
  {background}
  {foreground}
</svg>"#
    ))
}

/// Renders every icon of the set, without alpha.
pub fn generate_images(input: &IconInput, config: &IosConfig) -> PathStream {
    let source = input.try_map(|data| {
        let svg = icon_svg(&data.background.text(), &data.foreground.text())?;
        let metadata = ImageMetadata {
            width: INPUT_CONTENT_SIZE,
            height: INPUT_CONTENT_SIZE,
            ..data.background.metadata
        };
        Ok(RenderSource::new(Arc::from(svg.into_bytes()), metadata))
    });

    let targets = IOS_ICONS
        .iter()
        .map(|icon| {
            RenderTarget::new(config.output_path.join(icon.file_name()), icon.pixels())
                .without_alpha()
        })
        .collect();

    render_all(source, targets, config.force)
}

pub fn generate_manifest(config: &IosConfig) -> PathStream {
    let path = config.output_path.join("Contents.json");
    match manifest() {
        Ok(value) => ensure_file(path, Contents::Json(value), config.force),
        Err(err) => stream::once(async { Err(err) }).boxed(),
    }
}

/// Resolves the output directory, then writes the images and the manifest.
pub fn generate(input: &IconInput, options: &IosOptions) -> PathStream {
    let input = input.clone();
    let options = options.clone();

    stream::once(async move { options.resolve().await })
        .map_ok(move |config| generate_images(&input, &config).chain(generate_manifest(&config)))
        .try_flatten()
        .boxed()
}

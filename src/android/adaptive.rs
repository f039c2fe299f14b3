//! Adaptive launcher icons (API 26+).
//!
//! Each layer is written as a vector drawable when it converts cleanly and as
//! a set of per-density PNGs otherwise. The two manifests then point at
//! whichever resource type each layer ended up as.

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::error::{Error, Result};
use crate::input::{IconData, IconInput, SourceImage};
use crate::output::{Contents, PathStream, RenderTarget, ensure_file, render_all};
use crate::render::RenderSource;

use super::config::AndroidConfig;
use super::resources::{
    ADAPTIVE_ICON_MIN_SDK, DENSITIES, Density, LAUNCHER_BACKGROUND_NAME,
    LAUNCHER_FOREGROUND_NAME, LAUNCHER_NAME, Qualifier, ROUND_ICON_NAME, ResourceType, icon_path,
};
use super::vector_drawable;

/// Adaptive icon layer size in dp, including the safe-zone margin.
pub const ADAPTIVE_ICON_BASE_SIZE: u32 = 108;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Background,
    Foreground,
}

impl Layer {
    fn name(self) -> &'static str {
        match self {
            Self::Background => LAUNCHER_BACKGROUND_NAME,
            Self::Foreground => LAUNCHER_FOREGROUND_NAME,
        }
    }

    fn image(self, data: &IconData) -> &SourceImage {
        match self {
            Self::Background => &data.background,
            Self::Foreground => &data.foreground,
        }
    }
}

/// Progress through the adaptive icon outputs.
enum Step {
    Background,
    Foreground {
        background: ResourceType,
    },
    Manifests {
        background: ResourceType,
        foreground: ResourceType,
    },
    Done,
}

/// The `<adaptive-icon>` manifest referencing both layers.
pub fn manifest(background: ResourceType, foreground: ResourceType) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<adaptive-icon xmlns:android="http://schemas.android.com/apk/res/android">
    <background android:drawable="@{background}/{LAUNCHER_BACKGROUND_NAME}" />
    <foreground android:drawable="@{foreground}/{LAUNCHER_FOREGROUND_NAME}" />
</adaptive-icon>"#
    )
}

/// Writes both adaptive layers followed by the two manifests.
pub fn generate(input: &IconInput, config: &AndroidConfig) -> PathStream {
    let input = input.clone();
    let config = config.clone();

    stream::try_unfold(Step::Background, move |step| {
        let input = input.clone();
        let config = config.clone();
        async move {
            let next = match step {
                Step::Background => {
                    let (paths, background) =
                        emit_layer(&input, &config, Layer::Background).await?;
                    Some((paths, Step::Foreground { background }))
                }
                Step::Foreground { background } => {
                    let (paths, foreground) =
                        emit_layer(&input, &config, Layer::Foreground).await?;
                    Some((
                        paths,
                        Step::Manifests {
                            background,
                            foreground,
                        },
                    ))
                }
                Step::Manifests {
                    background,
                    foreground,
                } => Some((manifests(&config, background, foreground), Step::Done)),
                Step::Done => None,
            };
            Ok::<_, Error>(next)
        }
    })
    .try_flatten()
    .boxed()
}

/// Emits one layer, returning the resource type it was written as.
async fn emit_layer(
    input: &IconInput,
    config: &AndroidConfig,
    layer: Layer,
) -> Result<(PathStream, ResourceType)> {
    let data = input.read().await?;
    let svg = layer.image(&data).data.clone();

    match tokio::task::spawn_blocking(move || vector_drawable::convert(&svg)).await? {
        Ok(drawable) => {
            let path = icon_path(
                &config.output_path,
                ResourceType::Drawable,
                Qualifier::density(Density::Anydpi).with_min_api_level(ADAPTIVE_ICON_MIN_SDK),
                &format!("{}.xml", layer.name()),
            );
            let paths = ensure_file(path, Contents::Text(drawable.to_xml()), config.force);
            Ok((paths, ResourceType::Drawable))
        }
        Err(err) => {
            debug!("Rendering {} as PNG: {err}", layer.name());
            Ok((png_fallback(input, config, layer), ResourceType::Mipmap))
        }
    }
}

fn png_fallback(input: &IconInput, config: &AndroidConfig, layer: Layer) -> PathStream {
    let source = input.map(move |data| {
        let image = layer.image(data);
        RenderSource::new(image.data.clone(), image.metadata)
    });

    let file_name = format!("{}.png", layer.name());
    let targets = DENSITIES
        .iter()
        .map(|scale| {
            RenderTarget::new(
                icon_path(
                    &config.output_path,
                    ResourceType::Mipmap,
                    Qualifier::density(scale.density).with_min_api_level(ADAPTIVE_ICON_MIN_SDK),
                    &file_name,
                ),
                scale.pixels(ADAPTIVE_ICON_BASE_SIZE),
            )
        })
        .collect();

    render_all(source, targets, config.force)
}

fn manifests(
    config: &AndroidConfig,
    background: ResourceType,
    foreground: ResourceType,
) -> PathStream {
    let contents = manifest(background, foreground);
    let qualifier = Qualifier::density(Density::Anydpi).with_min_api_level(ADAPTIVE_ICON_MIN_SDK);
    let path = |name: &str| {
        icon_path(
            &config.output_path,
            ResourceType::Mipmap,
            qualifier,
            &format!("{name}.xml"),
        )
    };

    ensure_file(
        path(LAUNCHER_NAME),
        Contents::Text(contents.clone()),
        config.force,
    )
    .chain(ensure_file(
        path(ROUND_ICON_NAME),
        Contents::Text(contents),
        config.force,
    ))
    .boxed()
}

//! Legacy (pre-API 26) launcher icons.
//!
//! Both layers are inlined into a wrapper document that clips them to the
//! launcher shape and shades the shape's edges the way Android Studio's asset
//! studio does. The wrapper is then cropped so that the shape fills the
//! legacy 48dp icon box.

use std::sync::Arc;

use crate::error::Result;
use crate::input::{INPUT_CONTENT_SIZE, INPUT_IMAGE_MARGIN, INPUT_IMAGE_SIZE, IconInput};
use crate::output::{PathStream, RenderTarget, render_all};
use crate::render::RenderSource;
use crate::svg::prepare_for_inlining;

use super::config::AndroidConfig;
use super::resources::{
    DENSITIES, LAUNCHER_NAME, Qualifier, ROUND_ICON_NAME, ResourceType, icon_path,
};

/// Legacy icon box in dp.
pub const LEGACY_ICON_BASE_SIZE: u32 = 48;

const SQUARE_CONTENT_SIZE: f64 = 38.0;
const SQUARE_BORDER_RADIUS: f64 = 3.0;
const ROUND_CONTENT_SIZE: f64 = 44.0;

/// Drop shadow below the shape plus a faint highlight along its top-left edge.
pub const LIGHTNING_FILTER: &str = r#"
  <filter id="legacyLightningFilter">
    <!-- Drop shadow -->
    <feGaussianBlur in="SourceAlpha" stdDeviation="0.8" />
    <feOffset dx="0" dy="2.25" />
    <feComponentTransfer>
      <feFuncA type="linear" slope="0.2"/>
    </feComponentTransfer>
    <feComposite in2="SourceAlpha" operator="out"
      result="shadow"
    />

    <!-- Edge shade -->
    <feComponentTransfer in="SourceAlpha" result="opaque-alpha">
      <feFuncA type="linear" slope="0.2"/>
    </feComponentTransfer>
    <feOffset dx="-0.4" dy="-0.4" in="SourceAlpha" result="offset-alpha" />
    <feComposite in="opaque-alpha" in2="offset-alpha" operator="out"
      result="edge"
    />

    <feMerge>
      <feMergeNode in="shadow" />
      <feMergeNode in="edge" />
    </feMerge>
  </filter>"#;

/// Shape of a legacy launcher icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyShape {
    /// Rounded square, `ic_launcher`.
    Square,
    /// Circle, `ic_launcher_round`.
    Round,
}

impl LegacyShape {
    pub fn file_name(self) -> String {
        match self {
            Self::Square => format!("{LAUNCHER_NAME}.png"),
            Self::Round => format!("{ROUND_ICON_NAME}.png"),
        }
    }

    /// Size of the shape within the 48dp icon box.
    fn content_size(self) -> f64 {
        match self {
            Self::Square => SQUARE_CONTENT_SIZE,
            Self::Round => ROUND_CONTENT_SIZE,
        }
    }

    /// Region of the 108-unit source that maps onto the 48dp icon box.
    pub fn crop_size(self) -> f64 {
        INPUT_CONTENT_SIZE as f64 / (self.content_size() / LEGACY_ICON_BASE_SIZE as f64)
    }

    fn shape_element(self) -> String {
        let margin = INPUT_IMAGE_MARGIN;
        let content = INPUT_CONTENT_SIZE;
        match self {
            Self::Square => {
                let radius =
                    SQUARE_BORDER_RADIUS * (INPUT_CONTENT_SIZE as f64 / SQUARE_CONTENT_SIZE);
                format!(
                    r#"<rect
      x="{margin}" y="{margin}"
      width="{content}" height="{content}"
      rx="{radius}" ry="{radius}"
    />"#
                )
            }
            Self::Round => {
                let center = INPUT_IMAGE_SIZE as f64 / 2.0;
                let radius = INPUT_CONTENT_SIZE as f64 / 2.0;
                format!(
                    r#"<circle
      cx="{center}" cy="{center}"
      r="{radius}"
    />"#
                )
            }
        }
    }

    /// Composites both layers into a shaped, shaded 108×108 document.
    pub fn wrapper_svg(self, background: &str, foreground: &str) -> Result<String> {
        let size = INPUT_IMAGE_SIZE;
        let shape = self.shape_element();
        let background = prepare_for_inlining(background, "background")?;
        let foreground = prepare_for_inlining(foreground, "foreground")?;

        Ok(format!(
            r#"<svg version="1.1" xmlns="http://www.w3.org/2000/svg"
  viewBox="0 0 {size} {size}"
  width="{size}" height="{size}">
  <clipPath id="shape">
    {shape}
  </clipPath>
  {LIGHTNING_FILTER}

  <g clip-path="url(#shape)">
    {background}
    {foreground}
  </g>

  <g filter="url(#legacyLightningFilter)">
    {shape}
  </g>
</svg>"#
        ))
    }
}

/// Renders the legacy icon of `shape` at every density.
pub fn generate_icons(
    input: &IconInput,
    config: &AndroidConfig,
    shape: LegacyShape,
) -> PathStream {
    let source = input.try_map(move |data| {
        let svg = shape.wrapper_svg(&data.background.text(), &data.foreground.text())?;
        Ok(RenderSource::new(Arc::from(svg.into_bytes()), data.background.metadata)
            .with_crop(shape.crop_size()))
    });

    let file_name = shape.file_name();
    let targets = DENSITIES
        .iter()
        .map(|scale| {
            RenderTarget::new(
                icon_path(
                    &config.output_path,
                    ResourceType::Mipmap,
                    Qualifier::density(scale.density),
                    &file_name,
                ),
                scale.pixels(LEGACY_ICON_BASE_SIZE),
            )
        })
        .collect();

    render_all(source, targets, config.force)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BACKGROUND, FOREGROUND, icon_input};
    use futures::TryStreamExt;
    use std::path::PathBuf;

    #[test]
    fn crop_sizes_fit_shape_to_icon_box() {
        assert_eq!(LegacyShape::Square.crop_size(), 72.0 / (38.0 / 48.0));
        assert_eq!(LegacyShape::Round.crop_size(), 72.0 / (44.0 / 48.0));
    }

    #[test]
    fn square_wrapper_scales_border_radius() {
        let svg = LegacyShape::Square.wrapper_svg(BACKGROUND, FOREGROUND).unwrap();

        assert!(svg.contains(r#"x="18" y="18""#));
        assert!(svg.contains(r#"width="72" height="72""#));
        assert!(svg.contains(r#"rx="5.684210526315789" ry="5.684210526315789""#));
        assert!(svg.contains(r#"viewBox="0 0 108 108""#));
    }

    #[test]
    fn round_wrapper_uses_content_circle() {
        let svg = LegacyShape::Round.wrapper_svg(BACKGROUND, FOREGROUND).unwrap();
        assert!(svg.contains(r#"cx="54" cy="54""#));
        assert!(svg.contains(r#"r="36""#));
    }

    #[test]
    fn wrapper_keeps_filter_parameters() {
        let svg = LegacyShape::Round.wrapper_svg(BACKGROUND, FOREGROUND).unwrap();
        for needle in [
            r#"stdDeviation="0.8""#,
            r#"dx="0" dy="2.25""#,
            r#"dx="-0.4" dy="-0.4""#,
            r#"slope="0.2""#,
        ] {
            assert!(svg.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn wrapper_namespaces_layer_ids() {
        let layer = r##"<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108"><defs><clipPath id="shape"><rect width="10" height="10"/></clipPath></defs><rect clip-path="url(#shape)" width="108" height="108"/></svg>"##;
        let svg = LegacyShape::Square.wrapper_svg(layer, layer).unwrap();

        assert!(svg.contains(r#"id="background__shape""#));
        assert!(svg.contains(r#"id="foreground__shape""#));
        assert!(svg.contains("url(#foreground__shape)"));
        assert_eq!(svg.matches(r#"id="shape""#).count(), 1);
    }

    #[test]
    fn wrapper_rejects_malformed_layer() {
        assert!(LegacyShape::Square.wrapper_svg("<svg", FOREGROUND).is_err());
    }

    #[tokio::test]
    async fn renders_every_density() {
        let dir = tempfile::tempdir().unwrap();
        let input = icon_input(dir.path(), BACKGROUND, FOREGROUND).await;
        let config = AndroidConfig::new(Some(dir.path().join("res")), false);

        for shape in [LegacyShape::Square, LegacyShape::Round] {
            let written: Vec<PathBuf> = generate_icons(&input, &config, shape)
                .try_collect()
                .await
                .unwrap();
            assert_eq!(written.len(), 5);

            for (path, size) in written.iter().zip([48, 72, 96, 144, 192]) {
                assert!(path.ends_with(shape.file_name()));
                let image = image::open(path).unwrap().to_rgba8();
                assert_eq!(image.dimensions(), (size, size));
                assert_eq!(image.get_pixel(0, 0).0[3], 0, "corner lies outside the shape");
                assert_eq!(image.get_pixel(size / 2, size / 2).0[3], 255);
            }
        }

        assert!(dir.path().join("res/mipmap-xxxhdpi/ic_launcher_round.png").exists());
    }
}

//! Rasterization, compositing and PNG encoding.
//!
//! Everything in this module is synchronous and free of filesystem access.
//! The [`output`](crate::output) stage runs it on the blocking pool and
//! decides whether it needs to run at all.

use std::sync::Arc;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use resvg::tiny_skia::{BlendMode, Pixmap, PixmapPaint, Transform};

use crate::error::{Error, Result};
use crate::input::ImageMetadata;
use crate::svg::{crop_svg, parse_tree};

// ============================================================================
// RenderSource
// ============================================================================

/// How a composited layer is blended onto the image below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    /// Plain alpha overlay.
    Over,
    /// Keeps the image below only where the layer is opaque.
    DestIn,
}

/// An extra layer rendered at the same density as the base image.
///
/// This is the raster stencil-compositing path: a [`RenderSource`] built with
/// [`RenderSource::with_operation`] overlays layers or masks itself to a
/// stencil shape after rasterizing. The launcher generators shape their icons
/// with SVG clip paths in the wrapper document instead, so they never add
/// operations.
#[derive(Debug, Clone)]
pub enum Operation {
    Composite {
        svg: Arc<[u8]>,
        blend: Blend,
        /// Crop the layer to its centered region before rendering.
        crop_size: Option<f64>,
    },
}

/// The SVG document a set of render targets is produced from.
#[derive(Debug, Clone)]
pub struct RenderSource {
    pub svg: Arc<[u8]>,
    pub metadata: ImageMetadata,
    /// Crop the document to its centered `crop_size` region before rendering.
    pub crop_size: Option<f64>,
    /// Applied in order after the base image is rasterized.
    pub operations: Vec<Operation>,
}

impl RenderSource {
    /// A source rendered as-is.
    pub fn new(svg: Arc<[u8]>, metadata: ImageMetadata) -> Self {
        Self {
            svg,
            metadata,
            crop_size: None,
            operations: Vec::new(),
        }
    }

    pub fn with_crop(mut self, crop_size: f64) -> Self {
        self.crop_size = Some(crop_size);
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// The size the document occupies once cropped.
    pub fn effective_size(&self) -> f64 {
        self.crop_size.unwrap_or(self.metadata.width as f64)
    }

    /// The density that makes the (cropped) document rasterize at exactly
    /// `output_size` pixels.
    pub fn target_density(&self, output_size: u32) -> f64 {
        output_size as f64 / self.effective_size() * self.metadata.density
    }

    fn document(&self, svg: &[u8], crop_size: Option<f64>) -> Result<Vec<u8>> {
        match crop_size {
            Some(crop_size) => crop_svg(svg, self.metadata.width as f64, crop_size),
            None => Ok(svg.to_vec()),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Rasterizes an SVG document at `scale` times its intrinsic size.
pub fn rasterize(svg: &[u8], scale: f64) -> Result<Pixmap> {
    let tree = parse_tree(svg)?;
    let size = tree.size();
    let width = (size.width() as f64 * scale).round() as u32;
    let height = (size.height() as f64 * scale).round() as u32;

    let mut pixmap = Pixmap::new(width, height).ok_or(Error::EmptyRaster { width, height })?;
    let transform = Transform::from_scale(scale as f32, scale as f32);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(pixmap)
}

/// Renders `source` into a square PNG of `output_size` pixels.
pub fn render_png(
    source: &RenderSource,
    output_size: u32,
    remove_alpha: bool,
) -> Result<Vec<u8>> {
    let density = source.target_density(output_size);
    let scale = density / source.metadata.density;

    let document = source.document(&source.svg, source.crop_size)?;
    let mut pixmap = rasterize(&document, scale)?;

    for operation in &source.operations {
        match operation {
            Operation::Composite {
                svg,
                blend,
                crop_size,
            } => {
                let document = source.document(svg, *crop_size)?;
                let layer = rasterize(&document, scale)?;
                composite(&mut pixmap, &layer, *blend)?;
            }
        }
    }

    encode_png(&pixmap, remove_alpha)
}

/// Blends `layer`, centered, onto `base`.
pub fn composite(base: &mut Pixmap, layer: &Pixmap, blend: Blend) -> Result<()> {
    let x = (base.width() as i32 - layer.width() as i32) / 2;
    let y = (base.height() as i32 - layer.height() as i32) / 2;

    match blend {
        Blend::Over => {
            base.draw_pixmap(
                x,
                y,
                layer.as_ref(),
                &paint(BlendMode::SourceOver),
                Transform::identity(),
                None,
            );
        }
        Blend::DestIn => {
            // Pixels the layer does not cover must be cleared as well, so the
            // stencil is first expanded to the full base size.
            let (width, height) = (base.width(), base.height());
            let mut stencil =
                Pixmap::new(width, height).ok_or(Error::EmptyRaster { width, height })?;
            stencil.draw_pixmap(
                x,
                y,
                layer.as_ref(),
                &paint(BlendMode::SourceOver),
                Transform::identity(),
                None,
            );
            base.draw_pixmap(
                0,
                0,
                stencil.as_ref(),
                &paint(BlendMode::DestinationIn),
                Transform::identity(),
                None,
            );
        }
    }

    Ok(())
}

fn paint(blend_mode: BlendMode) -> PixmapPaint {
    PixmapPaint {
        blend_mode,
        ..PixmapPaint::default()
    }
}

/// Returns true if no pixel in the raster is even partially transparent.
pub fn is_opaque(pixmap: &Pixmap) -> bool {
    pixmap.pixels().iter().all(|pixel| pixel.alpha() == u8::MAX)
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes with maximum compression and no adaptive filtering.
///
/// With `remove_alpha` the alpha channel is dropped and an RGB PNG is written.
pub fn encode_png(pixmap: &Pixmap, remove_alpha: bool) -> Result<Vec<u8>> {
    let image = pixmap_to_rgba_image(pixmap);
    let (width, height) = image.dimensions();
    let mut buffer = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::NoFilter);

    if remove_alpha {
        let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
        encoder.write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)?;
    } else {
        encoder.write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)?;
    }

    Ok(buffer)
}

/// Converts a premultiplied tiny-skia pixmap to a straight-alpha image.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());

    for (target, pixel) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = pixel.demultiply();
        *target = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }

    image
}

// ============================================================================
// Tests
// ============================================================================

//! Strict SVG to Android vector drawable conversion.
//!
//! Only flat, solid-colored paths are supported. Anything the vector drawable
//! format cannot express faithfully (text, raster images, gradients, dashes,
//! filters, masks, clipping, group opacity) is rejected with a
//! [`ConversionError`] so that callers can fall back to raster output.

use std::fmt::Write as _;

use resvg::tiny_skia::{PathSegment, Transform};
use resvg::usvg::{self, BlendMode, FillRule, LineCap, LineJoin, Node, Paint};
use thiserror::Error;

use crate::svg::parse_tree;

/// Elements that are either rendered by usvg in a way the format cannot
/// express, or silently dropped when no font is available.
const UNSUPPORTED_ELEMENTS: &[&str] = &[
    "text",
    "tspan",
    "textPath",
    "image",
    "filter",
    "mask",
    "pattern",
    "foreignObject",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("SVG could not be parsed: {0}")]
    Parse(String),

    #[error("unsupported element <{0}>")]
    UnsupportedElement(String),

    #[error("unsupported paint server, only solid colors are supported")]
    UnsupportedPaint,

    #[error("dashed strokes are not supported")]
    DashedStroke,

    #[error("unsupported group effect: {0}")]
    GroupEffect(&'static str),
}

/// Fill or stroke color with its opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: f32,
}

impl SolidColor {
    fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: SolidColor,
    pub width: f32,
    pub line_cap: &'static str,
    pub line_join: &'static str,
    pub miter_limit: f32,
}

/// A single `<path>` element of a vector drawable.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPath {
    /// Absolute path data in viewport coordinates.
    pub data: String,
    pub fill: Option<SolidColor>,
    pub even_odd: bool,
    pub stroke: Option<StrokeStyle>,
}

/// A converted drawable, sized in dp with the SVG's viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDrawable {
    pub width: f32,
    pub height: f32,
    pub paths: Vec<VectorPath>,
}

impl VectorDrawable {
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        let _ = write!(
            xml,
            r#"<vector xmlns:android="http://schemas.android.com/apk/res/android"
    android:width="{w}dp"
    android:height="{h}dp"
    android:viewportWidth="{w}"
    android:viewportHeight="{h}">"#,
            w = number(self.width),
            h = number(self.height),
        );

        for path in &self.paths {
            xml.push_str("\n    <path");
            if let Some(fill) = &path.fill {
                attribute(&mut xml, "fillColor", &fill.hex());
                if fill.alpha < 1.0 {
                    attribute(&mut xml, "fillAlpha", &number(fill.alpha));
                }
                if path.even_odd {
                    attribute(&mut xml, "fillType", "evenOdd");
                }
            }
            if let Some(stroke) = &path.stroke {
                attribute(&mut xml, "strokeColor", &stroke.color.hex());
                if stroke.color.alpha < 1.0 {
                    attribute(&mut xml, "strokeAlpha", &number(stroke.color.alpha));
                }
                attribute(&mut xml, "strokeWidth", &number(stroke.width));
                attribute(&mut xml, "strokeLineCap", stroke.line_cap);
                attribute(&mut xml, "strokeLineJoin", stroke.line_join);
                attribute(&mut xml, "strokeMiterLimit", &number(stroke.miter_limit));
            }
            attribute(&mut xml, "pathData", &path.data);
            xml.push_str("/>");
        }

        xml.push_str("\n</vector>\n");
        xml
    }
}

fn attribute(xml: &mut String, name: &str, value: &str) {
    let _ = write!(xml, "\n        android:{name}=\"{value}\"");
}

/// Formats with at most three decimals and no trailing zeros.
fn number(value: f32) -> String {
    let rounded = (value as f64 * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}

/// Converts an SVG document into a vector drawable.
pub fn convert(svg: &[u8]) -> Result<VectorDrawable, ConversionError> {
    check_elements(svg)?;

    let tree = parse_tree(svg).map_err(|err| ConversionError::Parse(err.to_string()))?;
    let mut paths = Vec::new();
    collect_paths(tree.root(), &mut paths)?;

    Ok(VectorDrawable {
        width: tree.size().width(),
        height: tree.size().height(),
        paths,
    })
}

fn check_elements(svg: &[u8]) -> Result<(), ConversionError> {
    let text = std::str::from_utf8(svg).map_err(|err| ConversionError::Parse(err.to_string()))?;
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let document = roxmltree::Document::parse_with_options(text, options)
        .map_err(|err| ConversionError::Parse(err.to_string()))?;

    match document
        .descendants()
        .filter(|node| node.is_element())
        .map(|node| node.tag_name().name())
        .find(|name| UNSUPPORTED_ELEMENTS.contains(name))
    {
        Some(name) => Err(ConversionError::UnsupportedElement(name.to_string())),
        None => Ok(()),
    }
}

fn collect_paths(group: &usvg::Group, paths: &mut Vec<VectorPath>) -> Result<(), ConversionError> {
    if group.opacity().get() < 1.0 {
        return Err(ConversionError::GroupEffect("opacity"));
    }
    if group.clip_path().is_some() {
        return Err(ConversionError::GroupEffect("clip-path"));
    }
    if group.mask().is_some() {
        return Err(ConversionError::GroupEffect("mask"));
    }
    if !group.filters().is_empty() {
        return Err(ConversionError::GroupEffect("filter"));
    }
    if group.blend_mode() != BlendMode::Normal {
        return Err(ConversionError::GroupEffect("mix-blend-mode"));
    }

    for node in group.children() {
        match node {
            Node::Group(group) => collect_paths(group, paths)?,
            Node::Path(path) => {
                if let Some(path) = convert_path(path)? {
                    paths.push(path);
                }
            }
            Node::Image(_) => return Err(ConversionError::UnsupportedElement("image".into())),
            Node::Text(_) => return Err(ConversionError::UnsupportedElement("text".into())),
        }
    }

    Ok(())
}

fn solid(paint: &Paint, opacity: f32) -> Result<SolidColor, ConversionError> {
    match paint {
        Paint::Color(color) => Ok(SolidColor {
            red: color.red,
            green: color.green,
            blue: color.blue,
            alpha: opacity,
        }),
        _ => Err(ConversionError::UnsupportedPaint),
    }
}

fn convert_path(path: &usvg::Path) -> Result<Option<VectorPath>, ConversionError> {
    if !path.is_visible() || (path.fill().is_none() && path.stroke().is_none()) {
        return Ok(None);
    }

    let fill = path
        .fill()
        .map(|fill| solid(fill.paint(), fill.opacity().get()))
        .transpose()?;
    let even_odd = path
        .fill()
        .is_some_and(|fill| fill.rule() == FillRule::EvenOdd);

    let transform = path.abs_transform();
    let stroke = match path.stroke() {
        Some(stroke) => {
            if stroke.dasharray().is_some() {
                return Err(ConversionError::DashedStroke);
            }
            Some(StrokeStyle {
                color: solid(stroke.paint(), stroke.opacity().get())?,
                width: stroke.width().get() * uniform_scale(transform),
                line_cap: match stroke.linecap() {
                    LineCap::Butt => "butt",
                    LineCap::Round => "round",
                    LineCap::Square => "square",
                },
                line_join: match stroke.linejoin() {
                    LineJoin::Miter | LineJoin::MiterClip => "miter",
                    LineJoin::Round => "round",
                    LineJoin::Bevel => "bevel",
                },
                miter_limit: stroke.miterlimit().get(),
            })
        }
        None => None,
    };

    let local: &resvg::tiny_skia::Path = path.data();
    let data = match local.clone().transform(transform) {
        Some(data) => path_data(&data),
        None => return Ok(None),
    };

    Ok(Some(VectorPath {
        data,
        fill,
        even_odd,
        stroke,
    }))
}

fn uniform_scale(transform: Transform) -> f32 {
    (transform.sx * transform.sy - transform.kx * transform.ky)
        .abs()
        .sqrt()
}

fn path_data(path: &resvg::tiny_skia::Path) -> String {
    let mut data = String::new();
    for segment in path.segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                let _ = write!(data, "M{},{}", number(p.x), number(p.y));
            }
            PathSegment::LineTo(p) => {
                let _ = write!(data, "L{},{}", number(p.x), number(p.y));
            }
            PathSegment::QuadTo(c, p) => {
                let _ = write!(
                    data,
                    "Q{},{} {},{}",
                    number(c.x),
                    number(c.y),
                    number(p.x),
                    number(p.y)
                );
            }
            PathSegment::CubicTo(c1, c2, p) => {
                let _ = write!(
                    data,
                    "C{},{} {},{} {},{}",
                    number(c1.x),
                    number(c1.y),
                    number(c2.x),
                    number(c2.y),
                    number(p.x),
                    number(p.y)
                );
            }
            PathSegment::Close => data.push('Z'),
        }
    }
    data
}

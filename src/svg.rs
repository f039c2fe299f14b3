//! SVG text transforms and the shared usvg parser setup.
//!
//! The transforms here never touch the filesystem. They produce derived SVG
//! documents that the renderer later rasterizes:
//!
//! - [`strip_xml_headers`] drops the XML declaration and DOCTYPE so a document
//!   can be nested inside another one.
//! - [`prepare_for_inlining`] additionally namespaces ids, class names and
//!   stylesheet selectors so two independently authored documents can live
//!   side by side.
//! - [`crop_svg`] crops by wrapping the document in an outer viewport.

use std::collections::HashSet;
use std::fmt::Write;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use resvg::usvg::{Options, Tree, fontdb};
use simplecss::{AttributeOperator, SelectorToken, SelectorTokenizer, StyleSheet};

use crate::error::Result;

/// Rendering density (DPI) that SVG sources are decoded at.
///
/// Physical units (`in`, `mm`, `pt`) resolve against this, and the renderer
/// expresses its target densities relative to it.
pub const SVG_DENSITY: f64 = 72.0;

static FONT_DB: Lazy<Arc<fontdb::Database>> = Lazy::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
});

/// Parses SVG data into a render tree at [`SVG_DENSITY`].
pub(crate) fn parse_tree(data: &[u8]) -> Result<Tree> {
    let mut options = Options::default();
    options.dpi = SVG_DENSITY as f32;
    options.fontdb = FONT_DB.clone();
    Ok(Tree::from_data(data, &options)?)
}

fn parse_document(svg: &str) -> Result<roxmltree::Document<'_>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    Ok(roxmltree::Document::parse_with_options(svg, options)?)
}

// ============================================================================
// Header stripping
// ============================================================================

/// Removes the XML declaration, DOCTYPE and anything else outside the root
/// element.
///
/// The root element itself is returned byte-for-byte. Fails if the input is
/// not well-formed XML.
pub fn strip_xml_headers(svg: &str) -> Result<String> {
    let document = parse_document(svg)?;
    let range = document.root_element().range();
    Ok(svg[range].to_string())
}

// ============================================================================
// Inlining
// ============================================================================

static ID_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\sid\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).expect("valid regex"));

static CLASS_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\sclass\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

static URL_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(\s*(["']?)#([^)"'\s]+)(["']?)\s*\)"#).expect("valid regex")
});

static HREF_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r##"(\s(?:xlink:)?href\s*=\s*)(?:"#([^"]*)"|'#([^']*)')"##).expect("valid regex")
});

/// Namespacing applied to one document's ids and class names.
struct Prefixer<'a> {
    prefix: &'a str,
    declared_ids: HashSet<&'a str>,
}

impl Prefixer<'_> {
    /// References to ids the document does not declare are left alone.
    fn id(&self, id: &str) -> String {
        if self.declared_ids.contains(id) {
            format!("{}__{id}", self.prefix)
        } else {
            id.to_string()
        }
    }

    fn class(&self, class: &str) -> String {
        format!("{}__{class}", self.prefix)
    }

    fn class_list(&self, classes: &str) -> String {
        classes
            .split_whitespace()
            .map(|class| self.class(class))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Rewrites the `#id` and `.class` parts of a selector. Returns `None` for
    /// selectors simplecss cannot tokenize.
    fn selector(&self, selector: &str) -> Option<String> {
        let mut out = String::new();
        let mut tokens = SelectorTokenizer::from(selector).peekable();
        while let Some(token) = tokens.next() {
            match token.ok()? {
                // simplecss prints `.a` back as `*[class~='a']`.
                SelectorToken::UniversalSelector => {
                    let qualified = matches!(
                        tokens.peek(),
                        Some(Ok(SelectorToken::ClassSelector(_)
                            | SelectorToken::IdSelector(_)
                            | SelectorToken::AttributeSelector(..)
                            | SelectorToken::PseudoClass(_)
                            | SelectorToken::LangPseudoClass(_)))
                    );
                    if !qualified {
                        out.push('*');
                    }
                }
                SelectorToken::TypeSelector(name) => out.push_str(name),
                SelectorToken::ClassSelector(class)
                | SelectorToken::AttributeSelector("class", AttributeOperator::Contains(class)) => {
                    write!(out, ".{}", self.class(class)).ok()?
                }
                SelectorToken::IdSelector(id)
                | SelectorToken::AttributeSelector("id", AttributeOperator::Matches(id)) => {
                    write!(out, "#{}", self.id(id)).ok()?
                }
                SelectorToken::AttributeSelector(name, operator) => match operator {
                    AttributeOperator::Exists => write!(out, "[{name}]").ok()?,
                    AttributeOperator::Matches(value) => write!(out, "[{name}='{value}']").ok()?,
                    AttributeOperator::Contains(value) => write!(out, "[{name}~='{value}']").ok()?,
                    AttributeOperator::StartsWith(value) => {
                        write!(out, "[{name}|='{value}']").ok()?
                    }
                },
                SelectorToken::PseudoClass(class) => write!(out, ":{class}").ok()?,
                SelectorToken::LangPseudoClass(lang) => write!(out, ":lang({lang})").ok()?,
                SelectorToken::DescendantCombinator => out.push(' '),
                SelectorToken::ChildCombinator => out.push_str(" > "),
                SelectorToken::AdjacentCombinator => out.push_str(" + "),
            }
        }
        Some(out)
    }

    /// Re-emits a `<style>` sheet with every selector namespaced.
    ///
    /// At-rules are dropped, as usvg ignores them too.
    fn style_sheet(&self, css: &str) -> String {
        let sheet = StyleSheet::parse(css);
        let mut out = String::new();
        for rule in &sheet.rules {
            let selector = rule.selector.to_string();
            let selector = self.selector(&selector).unwrap_or(selector);
            out.push_str(&selector);
            out.push_str(" {");
            for declaration in &rule.declarations {
                out.push_str(declaration.name);
                out.push(':');
                out.push_str(declaration.value);
                if declaration.important {
                    out.push_str(" !important");
                }
                out.push(';');
            }
            out.push_str("}\n");
        }
        out
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;")
}

/// Strips XML headers and namespaces the document with `{prefix}__`.
///
/// Every declared `id` is prefixed along with its `url(#…)` and `href="#…"`
/// references. Class names in `class` attributes are prefixed too, and
/// `<style>` sheets are rewritten so their `#id` and `.class` selectors keep
/// matching only this document's elements.
pub fn prepare_for_inlining(svg: &str, prefix: &str) -> Result<String> {
    let document = parse_document(svg)?;
    let root = document.root_element();
    let prefixer = Prefixer {
        prefix,
        declared_ids: document
            .descendants()
            .filter_map(|node| node.attribute("id"))
            .collect(),
    };

    // Style elements are replaced wholesale, so splice them in before the
    // attribute passes run over the text.
    let mut body = String::new();
    let mut copied = root.range().start;
    for style in root
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "style")
    {
        let css: String = style
            .descendants()
            .filter_map(|node| if node.is_text() { node.text() } else { None })
            .collect();
        let range = style.range();
        body.push_str(&svg[copied..range.start]);
        body.push_str("<style>");
        body.push_str(&escape_text(&prefixer.style_sheet(&css)));
        body.push_str("</style>");
        copied = range.end;
    }
    body.push_str(&svg[copied..root.range().end]);

    let body = ID_ATTRIBUTE.replace_all(&body, |caps: &Captures| match caps.get(2) {
        Some(id) => format!("{}\"{}\"", &caps[1], prefixer.id(id.as_str())),
        None => format!("{}'{}'", &caps[1], prefixer.id(&caps[3])),
    });
    let body = CLASS_ATTRIBUTE.replace_all(&body, |caps: &Captures| match caps.get(2) {
        Some(classes) => format!("{}\"{}\"", &caps[1], prefixer.class_list(classes.as_str())),
        None => format!("{}'{}'", &caps[1], prefixer.class_list(&caps[3])),
    });
    let body = URL_REFERENCE.replace_all(&body, |caps: &Captures| {
        format!("url({}#{}{})", &caps[1], prefixer.id(&caps[2]), &caps[3])
    });
    let body = HREF_REFERENCE.replace_all(&body, |caps: &Captures| match caps.get(2) {
        Some(id) => format!("{}\"#{}\"", &caps[1], prefixer.id(id.as_str())),
        None => format!("{}'#{}'", &caps[1], prefixer.id(&caps[3])),
    });

    Ok(body.into_owned())
}

// ============================================================================
// Cropping
// ============================================================================

/// Crops an SVG to its centered `crop_size` region.
///
/// The original document is nested unmodified inside an outer `<svg>` whose
/// viewBox starts at `(full_size - crop_size) / 2`. Only the visible window
/// changes, so viewport-relative lengths inside the original keep their
/// apparent size.
pub fn crop_svg(svg: &[u8], full_size: f64, crop_size: f64) -> Result<Vec<u8>> {
    let offset = (full_size - crop_size) / 2.0;
    let original = String::from_utf8_lossy(svg);
    let stripped = strip_xml_headers(&original)?;

    let wrapped = format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{crop_size}" height="{crop_size}" viewBox="{offset} {offset} {crop_size} {crop_size}">
  {stripped}
</svg>"#
    );

    Ok(wrapped.into_bytes())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::rasterize;

    const WITH_DECLARATIONS: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108"><rect width="108" height="108" fill="#336699"/></svg>"##;

    const QUADRANTS: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108">
  <rect x="0" y="0" width="54" height="54" fill="#ff0000"/>
  <rect x="54" y="0" width="54" height="54" fill="#00ff00"/>
  <rect x="0" y="54" width="54" height="54" fill="#0000ff"/>
  <rect x="54" y="54" width="54" height="54" fill="#ffff00"/>
</svg>"##;

    const CENTERED_SQUARES: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108">
  <rect width="108" height="108" fill="#202020"/>
  <rect x="18" y="18" width="72" height="72" fill="#e0e0e0"/>
  <rect x="36" y="36" width="36" height="36" fill="#c03030"/>
</svg>"##;

    const MIXED_UNITS: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108">
  <rect width="100%" height="100%" fill="#102030"/>
  <rect x="25%" y="25%" width="50%" height="50%" fill="#f0a000"/>
  <rect x="10" y="10" width="20" height="20" fill="#00a0f0"/>
</svg>"##;

    #[test]
    fn strip_removes_declaration_and_doctype() {
        let stripped = strip_xml_headers(WITH_DECLARATIONS).unwrap();

        assert!(stripped.starts_with("<svg"));
        assert!(stripped.ends_with("</svg>"));
        assert!(!stripped.contains("<?xml"));
        assert!(!stripped.contains("DOCTYPE"));
    }

    #[test]
    fn strip_rejects_malformed_input() {
        assert!(strip_xml_headers("<svg><rect></svg>").is_err());
    }

    #[test]
    fn inlining_prefixes_ids_and_references() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
  <defs><linearGradient id="fade"/><clipPath id='clip'><rect width="1" height="1"/></clipPath></defs>
  <rect data-id="fade" fill="url(#fade)" clip-path="url('#clip')"/>
  <use xlink:href="#fade"/>
  <use href="#elsewhere"/>
</svg>"##;

        let inlined = prepare_for_inlining(svg, "foreground").unwrap();

        assert!(inlined.contains(r#"id="foreground__fade""#));
        assert!(inlined.contains("id='foreground__clip'"));
        assert!(inlined.contains("url(#foreground__fade)"));
        assert!(inlined.contains("url('#foreground__clip')"));
        assert!(inlined.contains(r##"xlink:href="#foreground__fade""##));
        // Not an id attribute, and not a declared id.
        assert!(inlined.contains(r#"data-id="fade""#));
        assert!(inlined.contains(r##"href="#elsewhere""##));
    }

    #[test]
    fn inlining_strips_headers() {
        let inlined = prepare_for_inlining(WITH_DECLARATIONS, "background").unwrap();
        assert!(inlined.starts_with("<svg"));
    }

    #[test]
    fn inlining_reports_parse_errors() {
        let err = prepare_for_inlining("<svg", "x").unwrap_err();
        assert!(err.to_string().starts_with("parsing SVG failed"));
    }

    #[test]
    fn crop_wraps_with_offset_viewbox() {
        let cropped = crop_svg(QUADRANTS.as_bytes(), 108.0, 72.0).unwrap();
        let text = String::from_utf8(cropped).unwrap();

        assert!(text.contains(r#"width="72" height="72" viewBox="18 18 72 72""#));
        assert!(text.contains(QUADRANTS));
    }

    #[test]
    fn crop_offset_is_not_rounded() {
        let cropped = crop_svg(QUADRANTS.as_bytes(), 108.0, 72.0 / (38.0 / 48.0)).unwrap();
        let text = String::from_utf8(cropped).unwrap();

        assert!(text.contains(r#"viewBox="8.526315789473685 8.526315789473685"#));
    }

    fn assert_crop_matches_extract(svg: &str, crop: u32, scale: u32) {
        let full = rasterize(svg.as_bytes(), scale as f64).unwrap();
        let cropped_svg = crop_svg(svg.as_bytes(), 108.0, crop as f64).unwrap();
        let cropped = rasterize(&cropped_svg, scale as f64).unwrap();

        let size = crop * scale;
        assert_eq!(cropped.width(), size);
        assert_eq!(cropped.height(), size);

        let offset = (108 - crop) / 2 * scale;
        let mut mismatch = 0;
        for y in 0..size {
            for x in 0..size {
                let expected = full.pixel(x + offset, y + offset).unwrap();
                let actual = cropped.pixel(x, y).unwrap();
                if expected != actual {
                    mismatch += 1;
                }
            }
        }
        assert_eq!(
            mismatch, 0,
            "crop to {crop} at {scale}x differs from extracted region"
        );
    }

    #[test]
    fn crop_matches_extracted_region() {
        for svg in [QUADRANTS, CENTERED_SQUARES, MIXED_UNITS, WITH_DECLARATIONS] {
            for crop in [108, 90, 72, 54, 36, 20] {
                assert_crop_matches_extract(svg, crop, 1);
            }
        }
    }

    #[test]
    fn crop_matches_extracted_region_when_scaled() {
        for svg in [QUADRANTS, CENTERED_SQUARES, MIXED_UNITS] {
            for (crop, scale) in [(72, 2), (72, 4), (54, 3)] {
                assert_crop_matches_extract(svg, crop, scale);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Stylesheets
    // ------------------------------------------------------------------------

    const CLASS_STYLED: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108">
  <style>.a{fill:#0000ff}</style>
  <rect class="a" width="108" height="108"/>
</svg>"##;

    const ID_STYLED: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108">
  <style><![CDATA[#bgrect { fill: #00ff00 }]]></style>
  <rect id="bgrect" width="108" height="108"/>
</svg>"##;

    const CLASHING_CLASS: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108">
  <style>.a{fill:#ff0000}</style>
  <circle class="a" cx="54" cy="54" r="10"/>
</svg>"##;

    fn side_by_side(background: &str, foreground: &str) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108">{}{}</svg>"#,
            prepare_for_inlining(background, "background").unwrap(),
            prepare_for_inlining(foreground, "foreground").unwrap(),
        )
    }

    fn rgb_at(svg: &str, x: u32, y: u32) -> [u8; 3] {
        let color = rasterize(svg.as_bytes(), 1.0).unwrap().pixel(x, y).unwrap();
        [color.red(), color.green(), color.blue()]
    }

    #[test]
    fn inlining_prefixes_class_names_and_selectors() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg">
  <style type="text/css">.cls-1, rect.cls-2 > #shape { fill: url(#fade) !important }</style>
  <linearGradient id="fade"/>
  <rect id="shape" class=" cls-1  cls-2" data-class="cls-1"/>
</svg>"##;

        let inlined = prepare_for_inlining(svg, "foreground").unwrap();

        assert!(inlined.contains(".foreground__cls-1 {fill:url(#foreground__fade) !important;}"));
        assert!(inlined.contains("rect.foreground__cls-2 > #foreground__shape {"));
        assert!(inlined.contains(r#"class="foreground__cls-1 foreground__cls-2""#));
        assert!(inlined.contains(r#"data-class="cls-1""#));
    }

    #[test]
    fn inlined_class_rules_stay_with_their_document() {
        let svg = side_by_side(CLASS_STYLED, CLASHING_CLASS);

        assert_eq!(rgb_at(&svg, 2, 2), [0, 0, 255]);
        assert_eq!(rgb_at(&svg, 54, 54), [255, 0, 0]);
    }

    #[test]
    fn inlined_id_rules_follow_renamed_ids() {
        let svg = side_by_side(ID_STYLED, CLASHING_CLASS);

        assert_eq!(rgb_at(&svg, 2, 2), [0, 255, 0]);
    }
}

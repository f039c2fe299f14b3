//! Shared fixtures for unit tests.

use std::path::Path;

use crate::input::{IconConfig, IconInput, read_icon};

/// Opaque, solid blue.
pub const BACKGROUND: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108" viewBox="0 0 108 108"><rect width="108" height="108" fill="#3a7bd5"/></svg>"##;

/// A white disc inside the content region.
pub const FOREGROUND: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108" viewBox="0 0 108 108"><circle cx="54" cy="54" r="20" fill="#ffffff"/></svg>"##;

/// A gradient fill, which vector drawables cannot express.
pub const GRADIENT_FOREGROUND: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="108" height="108">
  <defs>
    <linearGradient id="fade" x1="0" y1="0" x2="1" y2="1">
      <stop offset="0" stop-color="#ffffff"/>
      <stop offset="1" stop-color="#ff8800"/>
    </linearGradient>
  </defs>
  <circle cx="54" cy="54" r="20" fill="url(#fade)"/>
</svg>"##;

/// Writes the given layers into `dir` and opens them as an icon input.
pub async fn icon_input(dir: &Path, background: &str, foreground: &str) -> IconInput {
    let background_path = dir.join("icon-background.svg");
    let foreground_path = dir.join("icon.svg");
    std::fs::write(&background_path, background).unwrap();
    std::fs::write(&foreground_path, foreground).unwrap();

    read_icon(&IconConfig {
        background_path: Some(background_path),
        foreground_path,
    })
    .await
    .unwrap()
}

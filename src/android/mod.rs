//! Android launcher icon resources.
//!
//! Produces, in order:
//!
//! 1. legacy square icons (`mipmap-{density}/ic_launcher.png`)
//! 2. legacy round icons (`mipmap-{density}/ic_launcher_round.png`)
//! 3. adaptive icon layers and their `mipmap-anydpi-v26` manifests

pub mod adaptive;
pub mod config;
pub mod legacy;
pub mod resources;
pub mod vector_drawable;

use futures::StreamExt;

use crate::input::IconInput;
use crate::output::PathStream;

pub use config::AndroidConfig;
use legacy::LegacyShape;

/// Generates every Android launcher icon resource.
pub fn generate(input: &IconInput, config: &AndroidConfig) -> PathStream {
    legacy::generate_icons(input, config, LegacyShape::Square)
        .chain(legacy::generate_icons(input, config, LegacyShape::Round))
        .chain(adaptive::generate(input, config))
        .boxed()
}

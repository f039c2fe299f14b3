//! svg-app-icon: Android and iOS app icons from SVG sources
//!
//! This crate turns one or two 108×108 SVG layers (an opaque background and a
//! foreground) into the icon resources a React Native project needs:
//!
//! - Android legacy square and round launcher icons, adaptive icon layers
//!   (as vector drawables where possible) and their manifests
//! - an iOS `AppIcon.appiconset` with every idiom and scale plus its
//!   `Contents.json`
//!
//! Outputs are only rewritten when their sources changed, and sources are
//! only decoded when something needs rewriting.
//!
//! # Example
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use svg_app_icon::{Config, IconConfig, Platform, generate};
//!
//! # async fn run() -> svg_app_icon::Result<()> {
//! let mut config = Config::new(IconConfig {
//!     background_path: Some("icon-background.svg".into()),
//!     foreground_path: "icon.svg".into(),
//! });
//! config.platforms = vec![Platform::Android];
//!
//! let mut files = generate(config);
//! while let Some(path) = files.try_next().await? {
//!     println!("Wrote {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod android;
pub mod config;
mod error;
mod generate;
pub mod input;
pub mod ios;
pub mod output;
pub mod render;
pub mod svg;

#[cfg(feature = "clap")]
pub mod cli;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result, ValidationError};
pub use generate::{Config, Platform, generate};
pub use input::{IconConfig, IconData, IconInput, Input, read_icon};
pub use output::PathStream;

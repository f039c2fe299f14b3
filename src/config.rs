//! Layered command-line configuration.
//!
//! Values are resolved field by field from three layers, later ones winning:
//!
//! 1. built-in defaults ([`CliConfig::default`])
//! 2. the `svgAppIcon` object in the project's `app.json`
//! 3. command-line arguments
//!
//! ```json
//! {
//!   "name": "MyApp",
//!   "svgAppIcon": {
//!     "foregroundPath": "./assets/icon.svg",
//!     "platforms": ["android"],
//!     "logLevel": "debug"
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing::level_filters::LevelFilter;

use crate::android::config::DEFAULT_OUTPUT_PATH;
use crate::error::{Error, Result};
use crate::generate::{self, Platform};
use crate::input::IconConfig;

/// Verbosity of diagnostic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Self::Silent => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
        }
    }
}

/// A partial configuration, as read from `app.json` or the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ConfigLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios_output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
}

impl ConfigLayer {
    /// Fields set in `other` replace those in `self`.
    pub fn merge(self, other: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            background_path: other.background_path.or(self.background_path),
            foreground_path: other.foreground_path.or(self.foreground_path),
            platforms: other.platforms.or(self.platforms),
            force: other.force.or(self.force),
            android_output_path: other.android_output_path.or(self.android_output_path),
            ios_output_path: other.ios_output_path.or(self.ios_output_path),
            app_name: other.app_name.or(self.app_name),
            log_level: other.log_level.or(self.log_level),
        }
    }
}

/// The subset of `app.json` this tool reads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppJson {
    name: Option<String>,
    #[serde(default)]
    svg_app_icon: ConfigLayer,
}

/// A fully resolved command-line configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub background_path: PathBuf,
    pub foreground_path: PathBuf,
    pub platforms: Vec<String>,
    pub force: bool,
    pub android_output_path: PathBuf,
    pub ios_output_path: Option<PathBuf>,
    pub app_name: Option<String>,
    pub log_level: LogLevel,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            background_path: PathBuf::from("./icon-background.svg"),
            foreground_path: PathBuf::from("./icon.svg"),
            platforms: Platform::ALL.iter().map(|p| p.to_string()).collect(),
            force: false,
            android_output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            ios_output_path: None,
            app_name: None,
            log_level: LogLevel::default(),
        }
    }
}

impl CliConfig {
    fn apply(self, layer: ConfigLayer) -> CliConfig {
        CliConfig {
            background_path: layer.background_path.unwrap_or(self.background_path),
            foreground_path: layer.foreground_path.unwrap_or(self.foreground_path),
            platforms: layer.platforms.unwrap_or(self.platforms),
            force: layer.force.unwrap_or(self.force),
            android_output_path: layer.android_output_path.unwrap_or(self.android_output_path),
            ios_output_path: layer.ios_output_path.or(self.ios_output_path),
            app_name: layer.app_name.or(self.app_name),
            log_level: layer.log_level.unwrap_or(self.log_level),
        }
    }

    /// Checks the resolved values against the filesystem and builds the
    /// generation config.
    ///
    /// The foreground must exist. A missing background is not an error: the
    /// bundled default background is used instead.
    pub async fn into_generate_config(self, project_dir: &Path) -> Result<generate::Config> {
        if !exists(&self.foreground_path).await {
            return Err(Error::ForegroundNotFound {
                path: self.foreground_path,
            });
        }
        let platforms = parse_platforms(&self.platforms)?;

        let background_path = if exists(&self.background_path).await {
            Some(self.background_path)
        } else {
            debug!(
                "No background at {}, using the default",
                self.background_path.display()
            );
            None
        };

        Ok(generate::Config {
            icon: IconConfig {
                background_path,
                foreground_path: self.foreground_path,
            },
            platforms,
            force: self.force,
            android_output_path: Some(self.android_output_path),
            ios_output_path: self.ios_output_path,
            app_name: self.app_name,
            project_dir: project_dir.to_path_buf(),
        })
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Applies the layers in order on top of `defaults`.
pub fn resolve(defaults: CliConfig, file: ConfigLayer, args: ConfigLayer) -> CliConfig {
    defaults.apply(file.merge(args))
}

/// Reads the configuration layer from an `app.json` file.
///
/// The app's `name` provides `appName` unless `svgAppIcon` sets it
/// explicitly.
pub async fn read_file_config(path: &Path) -> Result<ConfigLayer> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|err| Error::io(path, err))?;
    let app: AppJson = serde_json::from_slice(&data)?;

    let named = ConfigLayer {
        app_name: app.name,
        ..Default::default()
    };
    Ok(named.merge(app.svg_app_icon))
}

/// Parses platform names, rejecting unknown ones.
pub fn parse_platforms(names: &[String]) -> Result<Vec<Platform>> {
    names.iter().map(|name| name.parse()).collect()
}

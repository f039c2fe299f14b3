//! Top-level generation entry point.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::android::{self, AndroidConfig};
use crate::error::Error;
use crate::input::{IconConfig, read_icon};
use crate::ios::{self, IosOptions};
use crate::output::PathStream;

/// A target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Android, Platform::Ios];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    /// Case-insensitive.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let lower = name.to_lowercase();
        Platform::ALL
            .into_iter()
            .find(|platform| platform.as_str() == lower)
            .ok_or(Error::UnsupportedPlatform(lower))
    }
}

/// Everything a generation run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub icon: IconConfig,
    pub platforms: Vec<Platform>,
    /// Rewrite outputs even when they are up to date.
    pub force: bool,
    pub android_output_path: Option<PathBuf>,
    pub ios_output_path: Option<PathBuf>,
    /// Preferred `ios/<app_name>` project when discovering the asset catalog.
    pub app_name: Option<String>,
    /// Directory the iOS asset catalog is discovered in.
    pub project_dir: PathBuf,
}

impl Config {
    pub fn new(icon: IconConfig) -> Self {
        Self {
            icon,
            platforms: Platform::ALL.to_vec(),
            force: false,
            android_output_path: None,
            ios_output_path: None,
            app_name: None,
            project_dir: PathBuf::from("."),
        }
    }
}

/// Generates icons for the configured platforms and yields each written path.
///
/// Platforms always run in the order Android, iOS, regardless of the order
/// they are listed in. Sources are decoded at most once per run, and only if
/// some output is out of date.
pub fn generate(config: Config) -> PathStream {
    stream::once(async move {
        let input = read_icon(&config.icon).await?;

        let mut steps: Vec<PathStream> = Vec::new();
        if config.platforms.contains(&Platform::Android) {
            let android_config =
                AndroidConfig::new(config.android_output_path.clone(), config.force);
            steps.push(android::generate(&input, &android_config));
        }
        if config.platforms.contains(&Platform::Ios) {
            let options = IosOptions {
                output_path: config.ios_output_path.clone(),
                app_name: config.app_name.clone(),
                project_dir: config.project_dir.clone(),
                force: config.force,
            };
            steps.push(ios::generate(&input, &options));
        }

        Ok::<_, Error>(stream::iter(steps).flatten())
    })
    .try_flatten()
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BACKGROUND, FOREGROUND};
    use std::path::Path;

    fn config(dir: &Path) -> Config {
        std::fs::write(dir.join("icon-background.svg"), BACKGROUND).unwrap();
        std::fs::write(dir.join("icon.svg"), FOREGROUND).unwrap();

        let mut config = Config::new(IconConfig {
            background_path: Some(dir.join("icon-background.svg")),
            foreground_path: dir.join("icon.svg"),
        });
        config.android_output_path = Some(dir.join("res"));
        config.ios_output_path = Some(dir.join("AppIcon.appiconset"));
        config
    }

    #[test]
    fn parses_platforms_case_insensitively() {
        assert_eq!("Android".parse::<Platform>().unwrap(), Platform::Android);
        assert_eq!("IOS".parse::<Platform>().unwrap(), Platform::Ios);

        let err = "Windows".parse::<Platform>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported platform windows");
    }

    #[tokio::test]
    async fn android_runs_before_ios() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.platforms = vec![Platform::Ios, Platform::Android];

        let written: Vec<PathBuf> = generate(config).try_collect().await.unwrap();

        assert_eq!(written.len(), 5 + 5 + 2 + 2 + 18 + 1);
        assert!(written[0].starts_with(dir.path().join("res")));
        assert!(written.last().unwrap().ends_with("Contents.json"));
    }

    #[tokio::test]
    async fn selected_platform_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.platforms = vec![Platform::Ios];

        let written: Vec<PathBuf> = generate(config).try_collect().await.unwrap();

        assert_eq!(written.len(), 19);
        assert!(!dir.path().join("res").exists());
    }

    #[tokio::test]
    async fn missing_foreground_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.icon.foreground_path = dir.path().join("missing.svg");

        let result: crate::Result<Vec<PathBuf>> = generate(config).try_collect().await;
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}

//! Output location of the iOS app icon set.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

pub const ASSET_NAME: &str = "AppIcon.appiconset";
const ASSET_CATALOG: &str = "Images.xcassets";

/// Where and how the app icon set is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IosConfig {
    /// The `AppIcon.appiconset` directory.
    pub output_path: PathBuf,
    pub force: bool,
}

/// Settings the output location is resolved from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IosOptions {
    /// Used as-is when set; otherwise the asset catalog is discovered.
    pub output_path: Option<PathBuf>,
    /// Preferred project directory name under `ios/`.
    pub app_name: Option<String>,
    /// Directory containing the `ios/` project.
    pub project_dir: PathBuf,
    pub force: bool,
}

impl IosOptions {
    pub async fn resolve(&self) -> Result<IosConfig> {
        let output_path = match &self.output_path {
            Some(path) => path.clone(),
            None => discover_iconset(&self.project_dir, self.app_name.as_deref()).await?,
        };
        Ok(IosConfig {
            output_path,
            force: self.force,
        })
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_dir())
}

/// Finds `ios/*/Images.xcassets` below `project_dir` and returns its app icon
/// set directory.
///
/// A catalog under `ios/<app_name>` wins when present, which keeps projects
/// like "My" and "My App" apart. Otherwise subdirectories are tried in name
/// order.
pub async fn discover_iconset(project_dir: &Path, app_name: Option<&str>) -> Result<PathBuf> {
    let ios_dir = project_dir.join("ios");

    if let Some(app_name) = app_name {
        let preferred = ios_dir.join(app_name).join(ASSET_CATALOG);
        if is_dir(&preferred).await {
            debug!("Using asset catalog {}", preferred.display());
            return Ok(preferred.join(ASSET_NAME));
        }
    }

    let not_found = || Error::IconsetNotFound {
        dir: ios_dir.clone(),
    };
    let mut entries = match tokio::fs::read_dir(&ios_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(err) => return Err(Error::io(&ios_dir, err)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| Error::io(&ios_dir, err))?
    {
        names.push(entry.file_name());
    }
    names.sort();

    for name in names {
        let candidate = ios_dir.join(name).join(ASSET_CATALOG);
        if is_dir(&candidate).await {
            debug!("Using asset catalog {}", candidate.display());
            return Ok(candidate.join(ASSET_NAME));
        }
    }

    Err(not_found())
}

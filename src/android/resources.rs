//! Android resource naming: resource types, density buckets and qualified
//! directory paths.

use std::fmt;
use std::path::{Path, PathBuf};

pub const LAUNCHER_NAME: &str = "ic_launcher";
pub const ROUND_ICON_NAME: &str = "ic_launcher_round";
pub const LAUNCHER_BACKGROUND_NAME: &str = "ic_launcher_background";
pub const LAUNCHER_FOREGROUND_NAME: &str = "ic_launcher_foreground";

/// First API level with adaptive icon support.
pub const ADAPTIVE_ICON_MIN_SDK: u32 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Mipmap,
    Drawable,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mipmap => "mipmap",
            Self::Drawable => "drawable",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Density {
    Mdpi,
    Hdpi,
    Xhdpi,
    Xxhdpi,
    Xxxhdpi,
    /// Density-independent resources such as vector drawables.
    Anydpi,
}

impl Density {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mdpi => "mdpi",
            Self::Hdpi => "hdpi",
            Self::Xhdpi => "xhdpi",
            Self::Xxhdpi => "xxhdpi",
            Self::Xxxhdpi => "xxxhdpi",
            Self::Anydpi => "anydpi",
        }
    }
}

/// A raster density bucket and its scale relative to mdpi.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityScale {
    pub density: Density,
    pub scale: f64,
}

impl DensityScale {
    /// Pixel size of an asset that measures `base_size` dp.
    pub fn pixels(&self, base_size: u32) -> u32 {
        (base_size as f64 * self.scale).round() as u32
    }
}

/// The raster densities every icon is produced at.
pub const DENSITIES: [DensityScale; 5] = [
    DensityScale {
        density: Density::Mdpi,
        scale: 1.0,
    },
    DensityScale {
        density: Density::Hdpi,
        scale: 1.5,
    },
    DensityScale {
        density: Density::Xhdpi,
        scale: 2.0,
    },
    DensityScale {
        density: Density::Xxhdpi,
        scale: 3.0,
    },
    DensityScale {
        density: Density::Xxxhdpi,
        scale: 4.0,
    },
];

/// Configuration qualifiers of a resource directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Qualifier {
    pub density: Density,
    pub min_api_level: Option<u32>,
}

impl Qualifier {
    pub fn density(density: Density) -> Self {
        Self {
            density,
            min_api_level: None,
        }
    }

    pub fn with_min_api_level(mut self, level: u32) -> Self {
        self.min_api_level = Some(level);
        self
    }
}

/// `{output}/{type}-{density}[-v{api}]/{file_name}`
pub fn icon_path(
    output_path: &Path,
    resource_type: ResourceType,
    qualifier: Qualifier,
    file_name: &str,
) -> PathBuf {
    let mut directory = format!("{}-{}", resource_type, qualifier.density.as_str());
    if let Some(level) = qualifier.min_api_level {
        directory.push_str(&format!("-v{level}"));
    }
    output_path.join(directory).join(file_name)
}

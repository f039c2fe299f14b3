//! Command-line interface.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use futures::TryStreamExt;

use crate::config::{CliConfig, ConfigLayer, LogLevel, read_file_config, resolve};
use crate::error::{Error, Result};
use crate::generate::generate;

/// Generate Android and iOS app icons from SVG sources.
#[derive(Debug, Default, Parser)]
#[command(name = "svg-app-icon", version)]
pub struct Args {
    /// Background icon path
    #[arg(long, value_name = "PATH")]
    pub background_path: Option<PathBuf>,

    /// Foreground icon path
    #[arg(long, value_name = "PATH")]
    pub foreground_path: Option<PathBuf>,

    /// Platforms for which to generate icons
    #[arg(long, value_name = "PLATFORM", num_args = 1..)]
    pub platforms: Option<Vec<String>>,

    /// Overwrite existing newer files
    #[arg(short, long)]
    pub force: bool,

    /// Android output path
    #[arg(long, value_name = "PATH")]
    pub android_output_path: Option<PathBuf>,

    /// iOS output path
    #[arg(long, value_name = "PATH")]
    pub ios_output_path: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,
}

impl Args {
    /// The arguments as a configuration layer. An absent `--force` leaves the
    /// lower layers' value in place.
    pub fn into_layer(self) -> ConfigLayer {
        ConfigLayer {
            background_path: self.background_path,
            foreground_path: self.foreground_path,
            platforms: self.platforms,
            force: self.force.then_some(true),
            android_output_path: self.android_output_path,
            ios_output_path: self.ios_output_path,
            app_name: None,
            log_level: self.log_level,
        }
    }
}

/// A resolved configuration and why `app.json` contributed nothing, if it
/// could not be read.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: CliConfig,
    pub skipped_file: Option<Error>,
}

/// Resolves defaults, `{project_dir}/app.json` and `args` into one config.
///
/// A missing or malformed `app.json` counts as an empty layer. Nothing is
/// logged here since the log level is only known once this returns.
pub async fn load_config(args: Args, project_dir: &Path) -> LoadedConfig {
    let (file, skipped_file) = match read_file_config(&project_dir.join("app.json")).await {
        Ok(layer) => (layer, None),
        Err(err) => (ConfigLayer::default(), Some(err)),
    };

    LoadedConfig {
        config: resolve(CliConfig::default(), file, args.into_layer()),
        skipped_file,
    }
}

/// Runs a full generation, reporting each written file to `out`.
///
/// Returns the number of files written.
pub async fn run(config: CliConfig, project_dir: &Path, out: &mut impl Write) -> Result<usize> {
    let config = config.into_generate_config(project_dir).await?;
    let report = |err| Error::io("<stdout>", err);

    let mut files = generate(config);
    let mut count = 0;
    while let Some(path) = files.try_next().await? {
        writeln!(out, "Wrote {}", path.display()).map_err(report)?;
        count += 1;
    }
    writeln!(out, "Done").map_err(report)?;

    Ok(count)
}

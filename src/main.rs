use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use svg_app_icon::cli::{self, Args, LoadedConfig};
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    println!("Running svg-app-icon");

    let project_dir = Path::new(".");
    let LoadedConfig {
        config,
        skipped_file,
    } = cli::load_config(Args::parse(), project_dir).await;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(config.log_level.level_filter())
        .with_target(false)
        .init();

    if let Some(err) = skipped_file {
        debug!("Ignoring {}: {err}", project_dir.join("app.json").display());
    }

    match cli::run(config, project_dir, &mut std::io::stdout()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

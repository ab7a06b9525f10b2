//! Command-line entry point.

mod sync_cmd;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "wallsync")]
#[command(about = "Mirror Immich albums into a bounded local wallpaper directory")]
#[command(version)]
pub struct Cli {
    /// Run a single sync cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

/// Load variables from an explicit env file, or `.env` when present.
///
/// Variables already set in the process environment take precedence.
pub fn load_env_file(path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }
    Ok(())
}

/// Build settings from the environment and run the sync command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::from_env().context("Invalid configuration")?;
    tracing::debug!("Loaded settings: {:?}", settings);
    sync_cmd::cmd_sync(settings, cli.once).await
}

//! wallsync - keep a local wallpaper directory fed from Immich.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallsync::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load .env file if present (before reading any settings)
    cli::load_env_file(cli.env_file.as_deref())?;

    // Initialize logging based on verbosity
    let default_filter = if cli.verbose {
        "wallsync=debug"
    } else {
        "wallsync=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    cli::run(cli).await
}

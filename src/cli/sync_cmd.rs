//! The sync command: run the mirror loop against Immich.

use anyhow::Context;
use console::style;

use crate::config::Settings;
use crate::immich::ImmichClient;
use crate::mirror::{Mirror, Shutdown};
use crate::utils::format_size;

/// Mirror the configured albums, once or until interrupted.
pub async fn cmd_sync(settings: Settings, once: bool) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let client = ImmichClient::from_settings(&settings).context("Failed to create HTTP client")?;

    print_banner(&settings, once);

    let shutdown = Shutdown::on_signal();
    let mirror = Mirror::new(client, settings);
    mirror.run(once, &shutdown).await?;

    if shutdown.is_triggered() {
        println!("{} Stopped", style("✓").green());
    }
    Ok(())
}

fn print_banner(settings: &Settings, once: bool) {
    let sources = if settings.album_ids.is_empty() {
        "favorites".to_string()
    } else {
        format!("{} album(s)", settings.album_ids.len())
    };
    let limits = match (settings.limits.max_count, settings.limits.max_bytes) {
        (None, None) => "unlimited".to_string(),
        (count, bytes) => {
            let count = count.map_or("no count cap".to_string(), |c| format!("max {} images", c));
            let bytes = bytes.map_or("no size cap".to_string(), |b| {
                format!("max {}", format_size(b))
            });
            format!("{}, {}", count, bytes)
        }
    };

    println!(
        "{} Syncing {} from {} into {} ({})",
        style("→").cyan(),
        sources,
        settings.server_url,
        settings.download_dir.display(),
        limits
    );
    if !once {
        println!(
            "{} Running continuously (interval: {}s)",
            style("→").cyan(),
            settings.sync_interval.as_secs()
        );
    }
}

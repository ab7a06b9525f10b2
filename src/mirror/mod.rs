//! Mirror loop: keep a bounded local copy of a remote collection.
//!
//! A cycle lists the remote assets, downloads the missing ones within the
//! remaining budget, and then evicts the oldest local files until the
//! directory fits its caps. Cycles run strictly one after another.

mod error;
pub mod eviction;
pub mod selection;
pub mod shutdown;
mod source;

pub use error::SyncError;
pub use eviction::{Eviction, Usage};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use source::AssetSource;

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ensure_dir, Settings};
use crate::immich::RemoteAsset;
use crate::storage::{self, LocalFile};
use crate::utils::format_size;

/// Counts produced by one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub downloaded: usize,
    pub evicted: usize,
    /// Selected assets that were already present or did not fit the budget.
    pub skipped: usize,
    pub failed: usize,
    /// The cycle stopped early because shutdown was requested.
    pub interrupted: bool,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "downloaded {}, evicted {}, skipped {}, failed {}",
            self.downloaded, self.evicted, self.skipped, self.failed
        )?;
        if self.interrupted {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}

/// Remaining room in the directory for this cycle's downloads.
#[derive(Debug, Clone, Copy)]
struct Budget {
    count: Option<usize>,
    bytes: Option<u64>,
}

impl Budget {
    /// Reason an asset of `size` bytes cannot be downloaded, if any.
    fn rejects(&self, size: Option<u64>) -> Option<&'static str> {
        if self.count == Some(0) {
            return Some("count budget exhausted");
        }
        match (self.bytes, size) {
            (Some(0), _) => Some("size budget exhausted"),
            (Some(left), Some(size)) if size > left => Some("larger than remaining size budget"),
            _ => None,
        }
    }

    fn consume(&mut self, bytes: u64) {
        if let Some(count) = self.count.as_mut() {
            *count = count.saturating_sub(1);
        }
        if let Some(left) = self.bytes.as_mut() {
            *left = left.saturating_sub(bytes);
        }
    }
}

/// The download-and-prune loop over one target directory.
pub struct Mirror<S> {
    source: S,
    settings: Settings,
    /// Stored size per asset id, learned from earlier downloads.
    learned_sizes: Mutex<HashMap<String, u64>>,
}

impl<S: AssetSource> Mirror<S> {
    pub fn new(source: S, settings: Settings) -> Self {
        Self {
            source,
            settings,
            learned_sizes: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run cycles until shutdown, or a single cycle when `once` is set.
    pub async fn run(&self, once: bool, shutdown: &Shutdown) -> Result<(), SyncError> {
        let mut shutdown = shutdown.clone();

        loop {
            if shutdown.is_triggered() {
                break;
            }

            info!("Starting sync at {}", chrono::Local::now().format("%c"));
            let report = self.sync_once(&shutdown).await?;
            info!("Sync complete: {}", report);

            if once || report.interrupted {
                break;
            }

            info!(
                "Sleeping for {} seconds",
                self.settings.sync_interval.as_secs()
            );
            tokio::select! {
                _ = tokio::time::sleep(self.settings.sync_interval) => {}
                _ = shutdown.wait() => break,
            }
        }

        Ok(())
    }

    /// Run one full cycle: list, download within budget, evict.
    ///
    /// Network errors on single assets are logged and counted as failures;
    /// authentication errors and an unusable target directory abort the cycle.
    pub async fn sync_once(&self, shutdown: &Shutdown) -> Result<SyncReport, SyncError> {
        let dir = self.settings.download_dir.as_path();
        ensure_dir(dir).map_err(|e| SyncError::directory(dir, e))?;

        match storage::remove_stale_temp_files(dir) {
            Ok(0) => {}
            Ok(n) => info!("Removed {} leftover partial downloads", n),
            Err(e) => warn!("Failed to clean partial downloads: {}", e),
        }

        let listed = self.list_remote().await?;
        let selection = {
            let mut rng = rand::rng();
            selection::select(
                selection::merge_listings(listed),
                self.settings.favorites,
                self.settings.random_select,
                &mut rng,
            )
        };

        let wanted: Vec<(RemoteAsset, String)> = selection
            .into_iter()
            .map(|asset| {
                let name = storage::file_name_for(&asset);
                (asset, name)
            })
            .collect();

        let local = storage::scan_directory(dir).map_err(|e| SyncError::directory(dir, e))?;
        let present: HashMap<&str, &LocalFile> =
            local.iter().map(|f| (f.file_name.as_str(), f)).collect();

        let mut budget = self.initial_budget(&wanted, &present);
        refresh_kept(&wanted, &present);
        let mut report = SyncReport::default();

        for (asset, name) in &wanted {
            if shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }
            if present.contains_key(name.as_str()) {
                report.skipped += 1;
                continue;
            }
            if let Some(reason) = budget.rejects(self.expected_size(asset).await) {
                debug!("Skipping {}: {}", name, reason);
                report.skipped += 1;
                continue;
            }

            let content = match self.fetch(asset, name).await {
                Ok(content) => content,
                Err(DownloadFailure::Fatal(e)) => return Err(SyncError::Auth(e)),
                Err(DownloadFailure::Soft(message)) => {
                    warn!("Failed to download {}: {}", asset.id, message);
                    report.failed += 1;
                    continue;
                }
            };

            let size = content.len() as u64;
            self.learned_sizes.lock().await.insert(asset.id.clone(), size);
            if let Some(reason) = budget.rejects(Some(size)) {
                debug!("Discarding {} ({}): {}", name, format_size(size), reason);
                report.skipped += 1;
                continue;
            }

            match self.store(name, content).await {
                Ok(()) => {
                    budget.consume(size);
                    report.downloaded += 1;
                }
                Err(message) => {
                    warn!("Failed to store {}: {}", name, message);
                    report.failed += 1;
                }
            }
        }

        report.evicted = self.enforce_limits(&wanted)?;
        Ok(report)
    }

    /// List every configured source. Only authentication failures are fatal.
    async fn list_remote(&self) -> Result<Vec<Vec<RemoteAsset>>, SyncError> {
        let mut listings = Vec::new();

        if self.settings.album_ids.is_empty() {
            match self.source.list_favorites().await {
                Ok(assets) => listings.push(assets),
                Err(e) if e.is_auth() => return Err(SyncError::Auth(e)),
                Err(e) => warn!("Error fetching favorites: {}", e),
            }
        }

        for album_id in &self.settings.album_ids {
            match self.source.list_album(album_id).await {
                Ok(assets) => listings.push(assets),
                Err(e) if e.is_auth() => return Err(SyncError::Auth(e)),
                Err(e) => warn!("Error fetching album {}: {}", album_id, e),
            }
        }

        Ok(listings)
    }

    /// Caps minus what the selected, already present files occupy.
    fn initial_budget(
        &self,
        wanted: &[(RemoteAsset, String)],
        present: &HashMap<&str, &LocalFile>,
    ) -> Budget {
        let kept: Vec<&LocalFile> = wanted
            .iter()
            .filter_map(|(_, name)| present.get(name.as_str()).copied())
            .collect();
        let kept_bytes: u64 = kept.iter().map(|f| f.size).sum();
        let limits = self.settings.limits;

        Budget {
            count: limits.max_count.map(|max| max.saturating_sub(kept.len())),
            bytes: limits.max_bytes.map(|max| max.saturating_sub(kept_bytes)),
        }
    }

    /// Size the asset will occupy on disk, if known before downloading.
    ///
    /// A size learned from an earlier download wins. The server's size only
    /// counts when the content is stored as-is.
    async fn expected_size(&self, asset: &RemoteAsset) -> Option<u64> {
        let learned = self.learned_sizes.lock().await.get(&asset.id).copied();
        match (learned, self.settings.target_size) {
            (Some(size), _) => Some(size),
            (None, None) => asset.byte_size(),
            (None, Some(_)) => None,
        }
    }

    /// Fetch and optionally resize one asset.
    async fn fetch(&self, asset: &RemoteAsset, name: &str) -> Result<Vec<u8>, DownloadFailure> {
        info!("Downloading {}", name);
        let content = self.source.download(asset).await.map_err(|e| {
            if e.is_auth() {
                DownloadFailure::Fatal(e)
            } else {
                DownloadFailure::Soft(e.to_string())
            }
        })?;

        match self.settings.target_size {
            Some(target) => {
                let file_name = name.to_string();
                tokio::task::spawn_blocking(move || {
                    crate::imaging::fit_or_passthrough(content, target, &file_name)
                })
                .await
                .map_err(|e| DownloadFailure::Soft(format!("resize task failed: {}", e)))
            }
            None => Ok(content),
        }
    }

    /// Atomically write fetched content under its final name.
    async fn store(&self, name: &str, content: Vec<u8>) -> Result<(), String> {
        let dir = self.settings.download_dir.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || storage::write_atomically(&dir, &name, &content))
            .await
            .map_err(|e| format!("write task failed: {}", e))?
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Rescan the directory and evict until it fits the caps.
    fn enforce_limits(&self, wanted: &[(RemoteAsset, String)]) -> Result<usize, SyncError> {
        let limits = self.settings.limits;
        if limits.is_unlimited() {
            return Ok(0);
        }

        let dir = self.settings.download_dir.as_path();
        let by_name: HashMap<&str, &RemoteAsset> =
            wanted.iter().map(|(a, n)| (n.as_str(), a)).collect();
        let protected: HashSet<&str> = if self.settings.favorites {
            wanted
                .iter()
                .filter(|(a, _)| a.is_favorite)
                .map(|(_, n)| n.as_str())
                .collect()
        } else {
            HashSet::new()
        };

        let mut files = storage::scan_directory(dir).map_err(|e| SyncError::directory(dir, e))?;
        for file in &mut files {
            file.asset_id = by_name.get(file.file_name.as_str()).map(|a| a.id.clone());
            file.protected = protected.contains(file.file_name.as_str());
        }

        let result = eviction::evict(&files, &limits, |f| std::fs::remove_file(&f.path));
        if !result.evicted.is_empty() {
            info!(
                "Cleanup complete, removed {} files ({} files, {} remain)",
                result.evicted.len(),
                result.usage.count,
                format_size(result.usage.bytes)
            );
        }
        if !result.usage.fits(&limits) {
            warn!(
                "Directory still exceeds limits after eviction ({} files, {})",
                result.usage.count,
                format_size(result.usage.bytes)
            );
        }

        Ok(result.evicted.len())
    }
}

/// Bump the modification time of selected files already on disk, so
/// eviction takes stray files before anything this cycle counted as kept.
fn refresh_kept(wanted: &[(RemoteAsset, String)], present: &HashMap<&str, &LocalFile>) {
    for (_, name) in wanted {
        if let Some(file) = present.get(name.as_str()) {
            if let Err(e) = storage::touch(&file.path) {
                warn!("Failed to refresh {}: {}", file.path.display(), e);
            }
        }
    }
}

/// Why a single download did not produce a file.
enum DownloadFailure {
    /// Abort the whole cycle.
    Fatal(crate::immich::ApiError),
    /// Log, count, and move on to the next asset.
    Soft(String),
}

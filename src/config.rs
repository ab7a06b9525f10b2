//! Configuration management for wallsync.
//!
//! Settings are read once from the environment (optionally seeded from a
//! `.env` file by the binary) and then passed around as an immutable value.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use url::Url;

/// Default Immich server URL.
pub const DEFAULT_IMMICH_URL: &str = "http://192.168.1.100:2283";

/// Default target directory for downloaded wallpapers.
pub const DEFAULT_DOWNLOAD_PATH: &str = "./wallpapers";

/// Default delay between sync cycles (10 minutes).
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 600;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default number of assets requested per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 250;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API_KEY environment variable is required")]
    MissingApiKey,
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl fmt::Display) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Caps on the local directory. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    pub max_count: Option<usize>,
    pub max_bytes: Option<u64>,
}

impl Limits {
    /// Build limits from raw values where zero means "no cap".
    pub fn new(max_count: usize, max_bytes: u64) -> Self {
        Self {
            max_count: (max_count > 0).then_some(max_count),
            max_bytes: (max_bytes > 0).then_some(max_bytes),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_count.is_none() && self.max_bytes.is_none()
    }

    /// Check whether a directory holding `count` files totalling `bytes` fits.
    pub fn allows(&self, count: usize, bytes: u64) -> bool {
        self.max_count.map_or(true, |max| count <= max)
            && self.max_bytes.map_or(true, |max| bytes <= max)
    }
}

/// Screen size that downloaded images are fitted to, parsed from `WxH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for TargetSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let (w, h) = lower
            .split_once('x')
            .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
        let width: u32 = w.trim().parse().map_err(|_| format!("bad width {:?}", w))?;
        let height: u32 = h.trim().parse().map_err(|_| format!("bad height {:?}", h))?;
        if width == 0 || height == 0 {
            return Err("dimensions must be positive".to_string());
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Application settings.
///
/// Custom `Debug` implementation redacts the API key.
#[derive(Clone)]
pub struct Settings {
    /// Immich server base URL.
    pub server_url: Url,
    /// API key sent as `x-api-key`.
    pub api_key: String,
    /// Albums to mirror. Empty means "mirror favorites".
    pub album_ids: Vec<String>,
    /// Always select favorites and evict them last.
    pub favorites: bool,
    /// Target directory for downloaded images.
    pub download_dir: PathBuf,
    /// Delay between cycles in loop mode.
    pub sync_interval: Duration,
    /// Number of random non-favorite assets to pick per cycle (0 = all).
    pub random_select: usize,
    /// Size and count caps for the target directory.
    pub limits: Limits,
    /// Optional screen size to fit images to.
    pub target_size: Option<TargetSize>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Assets requested per listing page.
    pub page_size: u32,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("server_url", &self.server_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("album_ids", &self.album_ids)
            .field("favorites", &self.favorites)
            .field("download_dir", &self.download_dir)
            .field("sync_interval", &self.sync_interval)
            .field("random_select", &self.random_select)
            .field("limits", &self.limits)
            .field("target_size", &self.target_size)
            .field("request_timeout", &self.request_timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl Settings {
    /// Load settings from process environment variables.
    ///
    /// Variables:
    /// - `IMMICH_URL` (default: `http://192.168.1.100:2283`)
    /// - `API_KEY` (required)
    /// - `ALBUM_IDS` comma-separated (default: empty, mirrors favorites)
    /// - `ALBUMS_FAVORITES` (default: `true`)
    /// - `DOWNLOAD_PATH` (default: `./wallpapers`)
    /// - `SYNC_INTERVAL` seconds (default: 600)
    /// - `RANDOM_SELECT` (default: 0 = all)
    /// - `MAX_IMAGES` (default: 0 = unlimited)
    /// - `MAX_LOCAL_GB` (default: 0 = unlimited)
    /// - `TARGET_SIZE` as `WxH` (default: unset)
    /// - `REQUEST_TIMEOUT` seconds (default: 60)
    /// - `PAGE_SIZE` (default: 250)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let raw_url = get("IMMICH_URL").unwrap_or_else(|| DEFAULT_IMMICH_URL.to_string());
        let server_url = Url::parse(raw_url.trim_end_matches('/'))
            .map_err(|e| ConfigError::invalid("IMMICH_URL", &raw_url, e))?;

        let album_ids = get("ALBUM_IDS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let favorites = match get("ALBUMS_FAVORITES") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ConfigError::invalid("ALBUMS_FAVORITES", &raw, "expected true or false")
            })?,
            None => true,
        };

        let download_dir = get("DOWNLOAD_PATH")
            .map(|raw| PathBuf::from(shellexpand::tilde(&raw).as_ref()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_PATH));

        let sync_interval: u64 = parse_var(&get, "SYNC_INTERVAL", DEFAULT_SYNC_INTERVAL_SECS)?;
        if sync_interval == 0 {
            return Err(ConfigError::invalid("SYNC_INTERVAL", "0", "must be at least 1 second"));
        }

        let random_select: usize = parse_var(&get, "RANDOM_SELECT", 0)?;
        let max_images: usize = parse_var(&get, "MAX_IMAGES", 0)?;
        let max_local_gb: f64 = parse_var(&get, "MAX_LOCAL_GB", 0.0)?;
        if !max_local_gb.is_finite() || max_local_gb < 0.0 {
            return Err(ConfigError::invalid(
                "MAX_LOCAL_GB",
                &max_local_gb.to_string(),
                "must be a non-negative number",
            ));
        }

        let target_size = get("TARGET_SIZE")
            .map(|raw| {
                raw.parse::<TargetSize>()
                    .map_err(|e| ConfigError::invalid("TARGET_SIZE", &raw, e))
            })
            .transpose()?;

        let request_timeout: u64 =
            parse_var(&get, "REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let page_size: u32 = parse_var(&get, "PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::invalid("PAGE_SIZE", "0", "must be positive"));
        }

        Ok(Self {
            server_url,
            api_key,
            album_ids,
            favorites,
            download_dir,
            sync_interval: Duration::from_secs(sync_interval),
            random_select,
            limits: Limits::new(max_images, (max_local_gb * BYTES_PER_GIB) as u64),
            target_size,
            request_timeout: Duration::from_secs(request_timeout),
            page_size,
        })
    }

    /// Ensure the download directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        ensure_dir(&self.download_dir)
    }
}

/// Create a directory (and parents), naming it in the error.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to create directory '{}': {}", path.display(), e),
        )
    })
}

fn parse_var<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw.parse().map_err(|e| ConfigError::invalid(var, &raw, e)),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

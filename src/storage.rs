//! Storage helpers for mirrored images on disk.
//!
//! Every file in the target directory is named deterministically from its
//! asset: `{sanitized_stem}-{asset_id}{.ext}`. Content is written to a hidden
//! temp file first and renamed into place, so a final name never points at a
//! partial download.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::immich::RemoteAsset;

/// Prefix of in-flight downloads. Hidden, so scanners and viewers skip it.
pub const TEMP_PREFIX: &str = ".wallsync-";

/// Stem used when an asset has no usable original name.
const FALLBACK_STEM: &str = "img";

/// A file owned by the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub file_name: String,
    /// Source asset, when the file matches one in the current listing.
    pub asset_id: Option<String>,
    /// Modification time of the file, set when it was renamed into place.
    pub downloaded_at: DateTime<Utc>,
    pub size: u64,
    /// Evicted only after every unprotected file is gone.
    pub protected: bool,
}

/// Construct the local file name for an asset.
pub fn file_name_for(asset: &RemoteAsset) -> String {
    let original = asset.original_file_name.as_deref().unwrap_or(FALLBACK_STEM);
    let path = Path::new(original);

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize_stem)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_STEM.to_string());
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(sanitize_stem)
        .filter(|e| !e.is_empty());

    match extension {
        Some(ext) => format!("{}-{}.{}", stem, sanitize_stem(&asset.id), ext),
        None => format!("{}-{}", stem, sanitize_stem(&asset.id)),
    }
}

/// Keep alphanumerics, spaces, dashes and underscores.
fn sanitize_stem(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// List the regular, non-hidden files of the target directory.
pub fn scan_directory(dir: &Path) -> io::Result<Vec<LocalFile>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                tracing::debug!("Skipping non UTF-8 file name {:?}", raw);
                continue;
            }
        };
        if file_name.starts_with('.') {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            // Vanished between read_dir and stat.
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            continue;
        }

        files.push(LocalFile {
            path: entry.path(),
            file_name,
            asset_id: None,
            downloaded_at: metadata.modified().map(DateTime::<Utc>::from)?,
            size: metadata.len(),
            protected: false,
        });
    }

    Ok(files)
}

/// Delete temp files left behind by an interrupted run.
pub fn remove_stale_temp_files(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_temp = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(TEMP_PREFIX));
        if is_temp && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Set a file's modification time to now, marking it as still wanted.
pub fn touch(path: &Path) -> io::Result<()> {
    fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::now())
}

/// Write `content` to `dir/file_name` via a temp file and rename.
///
/// Returns the final path. On any error the temp file is removed and no file
/// appears under the final name.
pub fn write_atomically(dir: &Path, file_name: &str, content: &[u8]) -> io::Result<PathBuf> {
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    let final_path = dir.join(file_name);
    temp.persist(&final_path).map_err(|e| e.error)?;
    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_name_for_keeps_stem_and_extension() {
        let asset = RemoteAsset::new("0b8a3f6e-1111", "IMG_0042.JPG");
        assert_eq!(file_name_for(&asset), "IMG_0042-0b8a3f6e-1111.JPG");
    }

    #[test]
    fn test_file_name_for_sanitizes_stem() {
        let asset = RemoteAsset::new("abc", "Beach (2024) / sunset?.png");
        // Path treats "/" as a separator, so only the last component survives.
        assert_eq!(file_name_for(&asset), "sunset-abc.png");

        let asset = RemoteAsset::new("abc", "Beach: (2024)*.png");
        assert_eq!(file_name_for(&asset), "Beach 2024-abc.png");
    }

    #[test]
    fn test_file_name_for_missing_name_uses_fallback() {
        let mut asset = RemoteAsset::new("abc", "x.jpg");
        asset.original_file_name = None;
        assert_eq!(file_name_for(&asset), "img-abc");

        let asset = RemoteAsset::new("abc", "???.jpg");
        assert_eq!(file_name_for(&asset), "img-abc.jpg");
    }

    #[test]
    fn test_file_name_for_is_deterministic() {
        let asset = RemoteAsset::new("id-1", "photo.heic");
        assert_eq!(file_name_for(&asset), file_name_for(&asset.clone()));
    }

    #[test]
    fn test_scan_directory_skips_hidden_and_dirs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a-1.jpg"), b"12345").unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let files = scan_directory(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "a-1.jpg");
        assert_eq!(files[0].size, 5);
        assert_eq!(files[0].asset_id, None);
        assert!(!files[0].protected);
    }

    #[test]
    fn test_write_atomically_creates_final_file_only() {
        let dir = tempdir().unwrap();
        let path = write_atomically(dir.path(), "pic-1.jpg", b"image bytes").unwrap();

        assert_eq!(path, dir.path().join("pic-1.jpg"));
        assert_eq!(fs::read(&path).unwrap(), b"image bytes");

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["pic-1.jpg"]);
    }

    #[test]
    fn test_write_atomically_replaces_existing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pic-1.jpg"), b"old").unwrap();
        write_atomically(dir.path(), "pic-1.jpg", b"new").unwrap();
        assert_eq!(fs::read(dir.path().join("pic-1.jpg")).unwrap(), b"new");
    }

    #[test]
    fn test_touch_refreshes_modification_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("old-1.jpg");
        fs::write(&path, b"old").unwrap();
        let day_ago = SystemTime::now() - std::time::Duration::from_secs(86_400);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(day_ago)
            .unwrap();

        touch(&path).unwrap();

        let modified = fs::metadata(&path).unwrap().modified().unwrap();
        assert!(modified > day_ago + std::time::Duration::from_secs(3600));
        assert_eq!(fs::read(&path).unwrap(), b"old");
    }

    #[test]
    fn test_remove_stale_temp_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".wallsync-abc123"), b"partial").unwrap();
        fs::write(dir.path().join(".other"), b"keep").unwrap();
        fs::write(dir.path().join("keep-1.jpg"), b"keep").unwrap();

        assert_eq!(remove_stale_temp_files(dir.path()).unwrap(), 1);
        assert!(!dir.path().join(".wallsync-abc123").exists());
        assert!(dir.path().join(".other").exists());
        assert!(dir.path().join("keep-1.jpg").exists());
    }
}

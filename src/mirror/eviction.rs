//! Eviction of local files to satisfy size and count caps.
//!
//! Order: unprotected before protected, then oldest `downloaded_at` first,
//! then file name so ties break deterministically.

use std::io;
use std::path::PathBuf;

use crate::config::Limits;
use crate::storage::LocalFile;

/// File count and total bytes of a set of local files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub count: usize,
    pub bytes: u64,
}

impl Usage {
    pub fn of(files: &[LocalFile]) -> Self {
        Self {
            count: files.len(),
            bytes: files.iter().map(|f| f.size).sum(),
        }
    }

    pub fn fits(&self, limits: &Limits) -> bool {
        limits.allows(self.count, self.bytes)
    }

    fn remove(&mut self, file: &LocalFile) {
        self.count = self.count.saturating_sub(1);
        self.bytes = self.bytes.saturating_sub(file.size);
    }
}

/// Outcome of an eviction pass.
#[derive(Debug, Default)]
pub struct Eviction {
    /// Paths actually removed, in removal order.
    pub evicted: Vec<PathBuf>,
    /// Candidates whose removal failed.
    pub failed: usize,
    /// Usage after the pass.
    pub usage: Usage,
}

/// All files sorted into eviction order.
pub fn eviction_order(files: &[LocalFile]) -> Vec<&LocalFile> {
    let mut ordered: Vec<&LocalFile> = files.iter().collect();
    ordered.sort_by(|a, b| {
        a.protected
            .cmp(&b.protected)
            .then(a.downloaded_at.cmp(&b.downloaded_at))
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
    ordered
}

/// Files that must go for `files` to fit `limits`, assuming every removal succeeds.
pub fn plan_eviction<'a>(files: &'a [LocalFile], limits: &Limits) -> Vec<&'a LocalFile> {
    let mut usage = Usage::of(files);
    let mut plan = Vec::new();

    for file in eviction_order(files) {
        if usage.fits(limits) {
            break;
        }
        usage.remove(file);
        plan.push(file);
    }

    plan
}

/// Remove files in eviction order until `files` fit `limits`.
///
/// A failed removal is logged and the next candidate is tried instead.
pub fn evict<F>(files: &[LocalFile], limits: &Limits, mut remove: F) -> Eviction
where
    F: FnMut(&LocalFile) -> io::Result<()>,
{
    let mut result = Eviction {
        usage: Usage::of(files),
        ..Default::default()
    };
    if limits.is_unlimited() {
        return result;
    }

    for file in eviction_order(files) {
        if result.usage.fits(limits) {
            break;
        }
        match remove(file) {
            Ok(()) => {
                tracing::info!(
                    "Limit exceeded ({} files, {}), deleting {}",
                    result.usage.count,
                    crate::utils::format_size(result.usage.bytes),
                    file.file_name
                );
                result.usage.remove(file);
                result.evicted.push(file.path.clone());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Already gone; it no longer counts.
                result.usage.remove(file);
            }
            Err(e) => {
                tracing::warn!("Failed to delete {}: {}", file.path.display(), e);
                result.failed += 1;
            }
        }
    }

    result
}

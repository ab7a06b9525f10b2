//! Fatal mirror errors. Per-asset failures never surface here.

use std::path::PathBuf;

use thiserror::Error;

use crate::immich::ApiError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Auth(#[source] ApiError),
    #[error("Target directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    pub(crate) fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Directory {
            path: path.into(),
            source,
        }
    }
}

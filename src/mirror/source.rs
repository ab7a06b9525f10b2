//! Seam between the mirror loop and the remote service.

use async_trait::async_trait;

use crate::immich::{ApiError, ImmichClient, RemoteAsset};

/// A remote collection the mirror can list and download from.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// All assets of one album.
    async fn list_album(&self, album_id: &str) -> Result<Vec<RemoteAsset>, ApiError>;

    /// All favorite assets of the account.
    async fn list_favorites(&self) -> Result<Vec<RemoteAsset>, ApiError>;

    /// Full content of an asset's original file.
    async fn download(&self, asset: &RemoteAsset) -> Result<Vec<u8>, ApiError>;
}

#[async_trait]
impl AssetSource for ImmichClient {
    async fn list_album(&self, album_id: &str) -> Result<Vec<RemoteAsset>, ApiError> {
        ImmichClient::list_album(self, album_id).await
    }

    async fn list_favorites(&self) -> Result<Vec<RemoteAsset>, ApiError> {
        ImmichClient::list_favorites(self).await
    }

    async fn download(&self, asset: &RemoteAsset) -> Result<Vec<u8>, ApiError> {
        self.download_original(&asset.id).await
    }
}

//! Wire types for the Immich REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of an Immich asset. Only images are mirrored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetKind {
    #[default]
    Image,
    Video,
    Audio,
    #[serde(other)]
    Other,
}

/// EXIF block attached to an asset when requested with `withExif`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifInfo {
    #[serde(default)]
    pub file_size_in_byte: Option<u64>,
}

/// An asset as listed by the remote service. Read-only from our side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAsset {
    pub id: String,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: AssetKind,
    #[serde(default)]
    pub original_file_name: Option<String>,
    #[serde(default)]
    pub file_created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub exif_info: Option<ExifInfo>,
}

impl RemoteAsset {
    /// Create an image asset with just an id and original file name.
    pub fn new(id: impl Into<String>, original_file_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            checksum: None,
            kind: AssetKind::Image,
            original_file_name: Some(original_file_name.into()),
            file_created_at: None,
            is_favorite: false,
            exif_info: None,
        }
    }

    /// Set the byte size reported by the server.
    pub fn with_size(mut self, bytes: u64) -> Self {
        self.exif_info = Some(ExifInfo {
            file_size_in_byte: Some(bytes),
        });
        self
    }

    /// Mark the asset as a favorite.
    pub fn favorite(mut self) -> Self {
        self.is_favorite = true;
        self
    }

    /// Size of the original file, when the server reported one.
    pub fn byte_size(&self) -> Option<u64> {
        self.exif_info.as_ref().and_then(|e| e.file_size_in_byte)
    }

    pub fn is_image(&self) -> bool {
        self.kind == AssetKind::Image
    }
}

/// Body of `POST /api/search/metadata`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetadataSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub with_exif: bool,
    pub page: u32,
    pub size: u32,
}

/// Response of `POST /api/search/metadata`.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub assets: AssetPage,
}

/// One page of assets. `nextPage` is a stringified page number or null.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssetPage {
    #[serde(default)]
    pub items: Vec<RemoteAsset>,
    #[serde(default)]
    pub next_page: Option<String>,
}

impl AssetPage {
    pub fn next_page_number(&self) -> Option<u32> {
        self.next_page.as_deref().and_then(|p| p.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_asset() {
        let json = serde_json::json!({
            "id": "0b8a3f6e-1111-2222-3333-444455556666",
            "checksum": "q8Hn0Yw2Zg==",
            "type": "IMAGE",
            "originalFileName": "IMG_0042.JPG",
            "fileCreatedAt": "2024-06-01T10:00:00.000Z",
            "isFavorite": true,
            "exifInfo": { "fileSizeInByte": 2048000, "make": "Canon" },
            "ownerId": "ignored"
        });
        let asset: RemoteAsset = serde_json::from_value(json).unwrap();
        assert_eq!(asset.id, "0b8a3f6e-1111-2222-3333-444455556666");
        assert_eq!(asset.original_file_name.as_deref(), Some("IMG_0042.JPG"));
        assert!(asset.is_favorite);
        assert!(asset.is_image());
        assert_eq!(asset.byte_size(), Some(2_048_000));
        assert!(asset.file_created_at.is_some());
    }

    #[test]
    fn test_unknown_asset_type_maps_to_other() {
        let asset: RemoteAsset =
            serde_json::from_value(serde_json::json!({"id": "a", "type": "HOLOGRAM"})).unwrap();
        assert_eq!(asset.kind, AssetKind::Other);
        assert!(!asset.is_image());
    }

    #[test]
    fn test_minimal_asset_defaults() {
        let asset: RemoteAsset = serde_json::from_value(serde_json::json!({"id": "a"})).unwrap();
        assert!(asset.is_image());
        assert!(!asset.is_favorite);
        assert_eq!(asset.byte_size(), None);
    }

    #[test]
    fn test_search_body_omits_unset_filters() {
        let body = MetadataSearch {
            album_ids: None,
            is_favorite: Some(true),
            kind: AssetKind::Image,
            with_exif: true,
            page: 1,
            size: 100,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "isFavorite": true,
                "type": "IMAGE",
                "withExif": true,
                "page": 1,
                "size": 100
            })
        );
    }

    #[test]
    fn test_next_page_number() {
        let page: AssetPage =
            serde_json::from_value(serde_json::json!({"items": [], "nextPage": "3"})).unwrap();
        assert_eq!(page.next_page_number(), Some(3));
        let last: AssetPage =
            serde_json::from_value(serde_json::json!({"items": [], "nextPage": null})).unwrap();
        assert_eq!(last.next_page_number(), None);
    }
}

//! Immich API client: paged asset listing and original downloads.

mod error;
mod types;

pub use error::ApiError;
pub use types::{AssetKind, ExifInfo, RemoteAsset};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info};
use url::Url;

use crate::config::Settings;
use types::{MetadataSearch, SearchResponse};

const SEARCH_ENDPOINT: &str = "/api/search/metadata";

/// Longest error body kept in an [`ApiError::Status`].
const MAX_ERROR_BODY: usize = 200;

/// Filter applied to a metadata search.
#[derive(Debug, Clone)]
enum SearchFilter {
    Album(String),
    Favorites,
}

/// HTTP client for a single Immich server.
#[derive(Clone)]
pub struct ImmichClient {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl ImmichClient {
    /// Create a client authenticated with `api_key`.
    pub fn new(
        server_url: &Url,
        api_key: &str,
        timeout: Duration,
        page_size: u32,
    ) -> Result<Self, ApiError> {
        let mut key = HeaderValue::from_str(api_key).map_err(|_| ApiError::InvalidApiKey)?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(concat!("wallsync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url: server_url.as_str().trim_end_matches('/').to_string(),
            page_size: page_size.max(1),
        })
    }

    /// Create a client from application settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ApiError> {
        Self::new(
            &settings.server_url,
            &settings.api_key,
            settings.request_timeout,
            settings.page_size,
        )
    }

    /// List every image in an album, following pagination.
    pub async fn list_album(&self, album_id: &str) -> Result<Vec<RemoteAsset>, ApiError> {
        info!("Fetching album {}", album_id);
        let assets = self.search(SearchFilter::Album(album_id.to_string())).await?;
        info!("Found {} items in album {}", assets.len(), album_id);
        Ok(assets)
    }

    /// List every favorite image of the account, following pagination.
    pub async fn list_favorites(&self) -> Result<Vec<RemoteAsset>, ApiError> {
        info!("Fetching favorites");
        let assets = self.search(SearchFilter::Favorites).await?;
        info!("Found {} favorites", assets.len());
        Ok(assets)
    }

    /// Download the original file of an asset.
    pub async fn download_original(&self, asset_id: &str) -> Result<Vec<u8>, ApiError> {
        let endpoint = format!("/api/assets/{}/original", asset_id);
        let response = self
            .client
            .get(self.url(&endpoint))
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await
            .map_err(|e| http_error(&endpoint, e))?;
        let response = check_status(&endpoint, response).await?;
        let bytes = response.bytes().await.map_err(|e| http_error(&endpoint, e))?;
        Ok(bytes.to_vec())
    }

    async fn search(&self, filter: SearchFilter) -> Result<Vec<RemoteAsset>, ApiError> {
        let mut all_assets = Vec::new();
        let mut page = 1;

        loop {
            let (assets, next_page) = self.fetch_page(&filter, page).await?;
            all_assets.extend(assets);

            match next_page {
                // Guard against a server that keeps returning the same page.
                Some(next) if next > page => {
                    debug!("Fetching page {} of {:?}", next, filter);
                    page = next;
                }
                _ => break,
            }
        }

        Ok(all_assets)
    }

    /// Fetch a single page of results.
    async fn fetch_page(
        &self,
        filter: &SearchFilter,
        page: u32,
    ) -> Result<(Vec<RemoteAsset>, Option<u32>), ApiError> {
        let body = MetadataSearch {
            album_ids: match filter {
                SearchFilter::Album(id) => Some(vec![id.clone()]),
                SearchFilter::Favorites => None,
            },
            is_favorite: matches!(filter, SearchFilter::Favorites).then_some(true),
            kind: AssetKind::Image,
            with_exif: true,
            page,
            size: self.page_size,
        };

        let response = self
            .client
            .post(self.url(SEARCH_ENDPOINT))
            .json(&body)
            .send()
            .await
            .map_err(|e| http_error(SEARCH_ENDPOINT, e))?;
        let response = check_status(SEARCH_ENDPOINT, response).await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| http_error(SEARCH_ENDPOINT, e))?;

        let next_page = parsed.assets.next_page_number();
        Ok((parsed.assets.items, next_page))
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

fn http_error(endpoint: &str, source: reqwest::Error) -> ApiError {
    ApiError::Http {
        endpoint: endpoint.to_string(),
        source,
    }
}

/// Map non-success responses to errors, keeping a short slice of the body.
async fn check_status(endpoint: &str, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Unauthorized {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY).collect(),
    })
}

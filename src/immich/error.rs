//! Immich API error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication rejected by {endpoint} (HTTP {status})")]
    Unauthorized { endpoint: String, status: u16 },
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("Request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("API key contains characters not allowed in an HTTP header")]
    InvalidApiKey,
}

impl ApiError {
    /// Authentication failures abort the whole cycle instead of one asset.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. } | ApiError::InvalidApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_auth_errors_are_fatal() {
        let unauthorized = ApiError::Unauthorized {
            endpoint: "/api/search/metadata".into(),
            status: 401,
        };
        let server = ApiError::Status {
            endpoint: "/api/assets/x/original".into(),
            status: 500,
            body: "boom".into(),
        };
        assert!(unauthorized.is_auth());
        assert!(ApiError::InvalidApiKey.is_auth());
        assert!(!server.is_auth());
    }

    #[test]
    fn test_display_includes_endpoint_and_status() {
        let err = ApiError::Status {
            endpoint: "/api/assets/abc/original".into(),
            status: 404,
            body: "Not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "/api/assets/abc/original returned HTTP 404: Not found"
        );
    }
}

use futures::Stream;
use futures::TryStreamExt;
use reqwest::{Client, Response};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use super::models::{ApiConfig, CatalogResponse, ErrorBody, LinkRequest, LinkResponse, DOWNLOAD_PATH};
use crate::domain::FormatCatalog;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("{0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Download URL not found")]
    NoDownloadUrl,

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    client: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> Result<Url> {
        let mut base = Url::parse(&self.config.base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {}", self.config.base_url, e)))?;
        // Without the trailing slash `join` would replace the last segment.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(DOWNLOAD_PATH)
            .map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))
    }

    /// Non-2xx responses carry `{ "error": "..." }` when the backend
    /// produced them itself; anything else is reported by status.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .map(|b| b.error)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status));
        warn!(%status, %message, "download API returned an error status");
        Err(ApiError::ApiError(message))
    }

    /// Format Catalog Service: list the video and audio formats for a video.
    pub async fn fetch_catalog(&self, video_id: &str) -> Result<FormatCatalog> {
        let mut url = self.endpoint()?;
        url.query_pairs_mut().append_pair("videoId", video_id);
        info!(video_id, "fetching format catalog");

        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response).await?;

        let json: CatalogResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

        if let Some(error) = json.error.filter(|e| !e.trim().is_empty()) {
            return Err(ApiError::ApiError(error));
        }

        Ok(json.catalog)
    }

    /// Link Issuance Service: get a download URL for one quality and type.
    pub async fn issue_link(&self, request: &LinkRequest) -> Result<LinkResponse> {
        let url = self.endpoint()?;
        info!(
            video_id = %request.video_id,
            quality = %request.quality,
            kind = request.media_kind.as_str(),
            "requesting download link"
        );

        let response = self.client.post(url).json(request).send().await?;
        let response = Self::check_status(response).await?;

        let json: LinkResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

        if let Some(error) = json.error.clone().filter(|e| !e.trim().is_empty()) {
            return Err(ApiError::ApiError(error));
        }
        if json.url.trim().is_empty() {
            return Err(ApiError::NoDownloadUrl);
        }

        Ok(json)
    }

    /// Download file with progress stream
    /// Returns (total_size, stream)
    pub async fn download_file_stream(
        &self,
        download_url: &str,
    ) -> Result<(Option<u64>, impl Stream<Item = Result<bytes::Bytes>>)> {
        let response = self
            .client
            .get(download_url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ApiError::ApiError(format!("Download request failed: {}", e)))?;

        let total_size = response.content_length();
        let stream = response.bytes_stream().map_err(ApiError::RequestError);

        Ok((total_size, stream))
    }
}

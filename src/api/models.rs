use std::env;

use serde::{Deserialize, Serialize};

use crate::domain::model::null_as_default;
use crate::domain::{FormatCatalog, MediaKind};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
/// Relative to the configured base, which may carry a path prefix.
pub const DOWNLOAD_PATH: &str = "api/download";

/// Response from `GET /api/download?videoId=...`
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub catalog: FormatCatalog,
}

/// Body of `POST /api/download`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub video_id: String,
    pub quality: String,
    #[serde(rename = "type")]
    pub media_kind: MediaKind,
}

/// Response from `POST /api/download`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quality: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_size: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub container: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body shape the backend uses for failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Hand external URLs to the parent process instead of the OS opener.
    pub embedded: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            embedded: false,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base) = env::var("DOWNLOAD_DIALOG_API_BASE") {
            if !base.trim().is_empty() {
                config.base_url = base.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(flag) = env::var("DOWNLOAD_DIALOG_EMBEDDED") {
            config.embedded = parse_flag(&flag);
        }
        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

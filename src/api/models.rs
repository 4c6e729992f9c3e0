use serde::{Deserialize, Serialize};

/// Error body returned by the scraping server for rejected requests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl ErrorResponse {
    pub fn summary(&self) -> String {
        self.messages.join("; ")
    }
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Server-push endpoint, takes the target as the `url` query parameter
    pub stream_path: String,
    /// Fixed location of the latest results file
    pub download_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5005".to_string(),
            stream_path: "/scrape".to_string(),
            download_path: "/download".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

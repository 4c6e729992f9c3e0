use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, TryStreamExt};
use reqwest::{header, Client, Response};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::models::{ApiConfig, ErrorResponse};
use super::sse;
use crate::domain::AppError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Server returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid server address: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("Please enter a sitemap URL")]
    EmptyTarget,

    #[error("Invalid URL. Please include http:// or https://")]
    InvalidTarget,
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::EmptyTarget => AppError::EmptyInput,
            ApiError::InvalidTarget => AppError::InvalidInput,
            other => AppError::Api(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&self.config.base_url)?.join(path)?)
    }

    /// Builds the server-push URL for a scrape of `target`.
    ///
    /// The server only accepts absolute http(s) URLs, so anything else is
    /// rejected here without a round trip.
    pub fn progress_url(&self, target: &str) -> Result<Url> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ApiError::EmptyTarget);
        }
        if !target.starts_with("http") || Url::parse(target).is_err() {
            return Err(ApiError::InvalidTarget);
        }

        let mut url = self.endpoint(&self.config.stream_path)?;
        url.query_pairs_mut().append_pair("url", target);
        Ok(url)
    }

    /// Fixed location of the latest results file
    pub fn download_url(&self) -> Result<Url> {
        self.endpoint(&self.config.download_path)
    }

    /// Maps a non-success response to an error, using the server's JSON
    /// error body when it sent one.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let summary = serde_json::from_str::<ErrorResponse>(&body)
            .map(|err| err.summary())
            .unwrap_or_default();

        if summary.is_empty() {
            Err(ApiError::ApiError(format!("request failed with status {}", status)))
        } else {
            debug!(%status, "server rejected request: {}", summary);
            Err(ApiError::ApiError(summary))
        }
    }

    /// Opens the progress stream and returns the `data` payload of each event
    /// in the order the server sent them.
    pub async fn open_progress_stream(
        &self,
        url: Url,
    ) -> Result<BoxStream<'static, Result<String>>> {
        info!(%url, "opening progress stream");
        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let bytes = response.bytes_stream().map_err(ApiError::RequestError);
        Ok(sse::data_events(bytes))
    }

    /// Download file with progress stream
    /// Returns (total_size, stream)
    pub async fn download_file_stream(
        &self,
        download_url: Url,
    ) -> Result<(Option<u64>, impl Stream<Item = Result<Bytes>>)> {
        let response = self.http.get(download_url).send().await?;
        let response = Self::check_status(response).await?;

        let total_size = response.content_length();
        let stream = response.bytes_stream().map_err(ApiError::RequestError);

        Ok((total_size, stream))
    }
}

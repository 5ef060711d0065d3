use async_trait::async_trait;
use reqwest::{
    Client, Response,
    header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, REFERER},
};
use tracing::debug;

use super::error::ExtractorError;

/// HTTP collaborator used by every site handler.
///
/// Implementations must be shareable across concurrently running handlers.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetches `url` and returns the body as text.
    async fn get(
        &self,
        url: &str,
        referer: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<String, ExtractorError>;

    /// Returns the `Content-Length` of `url`.
    async fn probe_size(&self, url: &str, referer: Option<&str>) -> Result<u64, ExtractorError>;

    /// Returns the media type of `url`, without parameters.
    async fn content_type(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<String, ExtractorError>;
}

/// [`HttpFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        url: &str,
        referer: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<Response, ExtractorError> {
        let mut request = self.client.get(url).headers(headers.clone());
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(
        &self,
        url: &str,
        referer: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<String, ExtractorError> {
        debug!("GET {}", url);
        let body = self.send(url, referer, headers).await?.text().await?;
        Ok(body)
    }

    async fn probe_size(&self, url: &str, referer: Option<&str>) -> Result<u64, ExtractorError> {
        // Only the headers are read, the body is dropped with the response.
        let response = self.send(url, referer, &HeaderMap::new()).await?;
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| ExtractorError::MissingContentLength(url.to_string()))
    }

    async fn content_type(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<String, ExtractorError> {
        let response = self.send(url, referer, &HeaderMap::new()).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Ok(media_type(content_type).to_string())
    }
}

/// Strips parameters from a `Content-Type` value: `video/mp4; x=y` -> `video/mp4`.
pub fn media_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or_default()
}

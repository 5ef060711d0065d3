use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use rustc_hash::FxHashMap;

use super::{error::ExtractorError, http::HttpFetcher};

/// In-memory [`HttpFetcher`] serving canned responses by exact URL.
#[derive(Default)]
pub(crate) struct MockFetcher {
    pages: FxHashMap<String, String>,
    sizes: FxHashMap<String, u64>,
    content_types: FxHashMap<String, String>,
    hits: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    pub(crate) fn with_size(mut self, url: &str, size: u64) -> Self {
        self.sizes.insert(url.to_string(), size);
        self
    }

    pub(crate) fn with_content_type(mut self, url: &str, content_type: &str) -> Self {
        self.content_types
            .insert(url.to_string(), content_type.to_string());
        self
    }

    /// Number of page requests made for `url`.
    pub(crate) fn hits(&self, url: &str) -> usize {
        self.hits.lock().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl HttpFetcher for MockFetcher {
    async fn get(
        &self,
        url: &str,
        _referer: Option<&str>,
        _headers: &HeaderMap,
    ) -> Result<String, ExtractorError> {
        self.hits.lock().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ExtractorError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
    }

    async fn probe_size(&self, url: &str, _referer: Option<&str>) -> Result<u64, ExtractorError> {
        self.sizes
            .get(url)
            .copied()
            .ok_or_else(|| ExtractorError::MissingContentLength(url.to_string()))
    }

    async fn content_type(
        &self,
        url: &str,
        _referer: Option<&str>,
    ) -> Result<String, ExtractorError> {
        Ok(self.content_types.get(url).cloned().unwrap_or_default())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use super::{error::ExtractorError, http::HttpFetcher, options::Options};
use crate::media::Data;

/// Shared state of a site handler: its name, the HTTP collaborator and the
/// headers sent with every page request.
///
/// Handlers keep no per-call state here. Cookies come from
/// [`Options::cookie`] and are attached per request.
#[derive(Clone)]
pub struct Extractor {
    // name of the site, e.g., "YouTube", "Bilibili"...
    pub platform_name: String,
    pub fetcher: Arc<dyn HttpFetcher>,
    platform_headers: HeaderMap,
    referer: Option<&'static str>,
}

impl Extractor {
    pub fn new(platform_name: impl Into<String>, fetcher: Arc<dyn HttpFetcher>) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        default_headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.8,zh-CN;q=0.5"),
        );

        Self {
            platform_name: platform_name.into(),
            fetcher,
            platform_headers: default_headers,
            referer: None,
        }
    }

    #[inline]
    pub fn set_referer_static(&mut self, referer: &'static str) {
        self.referer = Some(referer);
    }

    /// Platform headers plus the `Cookie` header built from `options`.
    pub fn headers_for(&self, options: &Options) -> HeaderMap {
        let mut headers = self.platform_headers.clone();
        if let Some(cookie) = options.cookie.as_deref().map(normalize_cookie)
            && !cookie.is_empty()
        {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(e) => {
                    // If cookies are malformed, skip the Cookie header instead of sending
                    // an invalid value.
                    debug!(error = %e, "Failed to build Cookie header");
                }
            }
        }
        headers
    }

    /// Fetches a page with the platform headers and referer, giving up when
    /// the call is cancelled.
    pub async fn get_page(&self, url: &str, options: &Options) -> Result<String, ExtractorError> {
        let headers = self.headers_for(options);
        tokio::select! {
            biased;
            _ = options.cancellation.cancelled() => Err(ExtractorError::Cancelled),
            page = self.fetcher.get(url, self.referer, &headers) => page,
        }
    }

    /// Best effort size probe: failures are logged and reported as 0.
    pub async fn probe_size_or_zero(&self, url: &str) -> u64 {
        match self.fetcher.probe_size(url, self.referer).await {
            Ok(size) => size,
            Err(e) => {
                warn!(platform = %self.platform_name, error = %e, "Failed to probe size");
                0
            }
        }
    }
}

/// Accepts `a=b; c=d` as well as one cookie per line.
fn normalize_cookie(raw: &str) -> String {
    raw.split(&[';', '\n'][..])
        .map(str::trim)
        .filter(|part| {
            part.split_once('=')
                .is_some_and(|(name, value)| !name.trim().is_empty() && !value.trim().is_empty())
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// The capability every site handler implements.
///
/// Implementations are stateless across calls and safe to invoke
/// concurrently. On success the returned list is non-empty; each element is
/// either a complete [`Data`] or an error placeholder for one playlist item.
/// Normalization is applied by the registry, not by handlers.
#[async_trait]
pub trait PlatformExtractor: Send + Sync {
    fn get_extractor(&self) -> &Extractor;

    async fn extract(&self, url: &str, options: &Options) -> Result<Vec<Data>, ExtractorError>;
}

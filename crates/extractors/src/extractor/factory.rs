use std::sync::{Arc, LazyLock};

use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::{
    error::ExtractorError, options::Options, platform_extractor::PlatformExtractor,
    utils::capture_group_1,
};
use crate::media::Data;

/// Bare Bilibili identifiers accepted in place of a URL.
static SHORT_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:av\d+|BV[0-9A-Za-z]+|ep\d+)$").unwrap());

/// Registrable domain label followed by a known public suffix.
static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([a-z0-9][-a-z0-9]{0,62})\.(?:com\.cn|com\.hk|cn|com|net|edu|gov|biz|org|info|pro|name|xxx|xyz|be|me|top|cc|tv|tt)(?:$|[.:/])",
    )
    .unwrap()
});

const BILIBILI_VIDEO_URL: &str = "https://www.bilibili.com/video/";
const BILIBILI_BANGUMI_URL: &str = "https://www.bilibili.com/bangumi/play/";

// Hosts whose domain token is not their registrable domain.
const HOST_OVERRIDES: &[(&str, &str)] = &[("haokan.baidu.com", "haokan")];

/// Outcome of the routing step: the URL handed to the handler and the domain
/// token used to pick it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub url: String,
    pub domain: String,
}

/// Maps domain tokens to site handlers.
///
/// Populated once at construction; afterwards it is only read and can be
/// shared freely between concurrent callers.
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: FxHashMap<String, Arc<dyn PlatformExtractor>>,
    fallback: Option<Arc<dyn PlatformExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `extractor` for a domain token such as `youtube`.
    ///
    /// Registering the same token twice replaces the previous handler.
    pub fn register(
        &mut self,
        domain: impl Into<String>,
        extractor: Arc<dyn PlatformExtractor>,
    ) -> &mut Self {
        self.extractors.insert(domain.into(), extractor);
        self
    }

    /// Registers the handler used for domains without a dedicated one.
    pub fn register_fallback(&mut self, extractor: Arc<dyn PlatformExtractor>) -> &mut Self {
        self.fallback = Some(extractor);
        self
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.extractors.keys().map(String::as_str)
    }

    /// Resolves user input to the URL to extract and its domain token.
    ///
    /// Leading and trailing whitespace is ignored. A bare `av…`, `BV…` or
    /// `ep…` identifier is rewritten to its Bilibili page URL.
    pub fn route(input: &str) -> Result<Route, ExtractorError> {
        let input = input.trim();

        if SHORT_LINK_REGEX.is_match(input) {
            let base = if input.starts_with("ep") {
                BILIBILI_BANGUMI_URL
            } else {
                BILIBILI_VIDEO_URL
            };
            return Ok(Route {
                url: format!("{base}{input}"),
                domain: "bilibili".to_string(),
            });
        }

        let parsed = url::Url::parse(input)?;
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();

        let domain = HOST_OVERRIDES
            .iter()
            .find(|(h, _)| *h == host)
            .map(|(_, token)| (*token).to_string())
            .or_else(|| capture_group_1(&DOMAIN_REGEX, &host).map(ToOwned::to_owned))
            .unwrap_or_default();

        Ok(Route {
            url: input.to_string(),
            domain,
        })
    }

    /// Handler registered for `domain`, or the fallback handler.
    pub fn extractor_for(&self, domain: &str) -> Result<&Arc<dyn PlatformExtractor>, ExtractorError> {
        self.extractors
            .get(domain)
            .or(self.fallback.as_ref())
            .ok_or(ExtractorError::UnsupportedExtractor)
    }

    /// Routes `input`, runs the selected handler and normalizes every result.
    ///
    /// A handler failure is returned as is. Per-item failures of a playlist
    /// are carried inside the returned list. Cancelling
    /// [`Options::cancellation`] abandons the call with
    /// [`ExtractorError::Cancelled`].
    pub async fn extract(&self, input: &str, options: &Options) -> Result<Vec<Data>, ExtractorError> {
        let route = Self::route(input)?;
        let extractor = self.extractor_for(&route.domain)?;
        debug!(
            domain = %route.domain,
            platform = %extractor.get_extractor().platform_name,
            url = %route.url,
            "dispatching"
        );

        let mut data = tokio::select! {
            biased;
            _ = options.cancellation.cancelled() => return Err(ExtractorError::Cancelled),
            result = extractor.extract(&route.url, options) => result?,
        };
        for item in data.iter_mut() {
            item.normalize();
        }
        Ok(data)
    }
}

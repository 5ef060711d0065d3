use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use regex::Regex;
use tracing::debug;

use super::cipher::{CipherOp, parse_operations};
use crate::extractor::{
    cache::TtlCache, error::ExtractorError, options::Options, platform_extractor::Extractor,
    utils::capture_group_1,
};

/// How long a fetched player script and its parsed operations stay valid.
pub const PLAYER_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

const BASE_URL: &str = "https://www.youtube.com";

static BASEJS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(/s/player/\w+/player_ias\.vflset/\w+/base\.js)").unwrap()
});

/// The player script referenced by a video's embed page.
#[derive(Debug, Clone)]
pub struct PlayerScript {
    // e.g. /s/player/abcd1234/player_ias.vflset/en_US/base.js
    pub path: String,
    pub js: Arc<str>,
}

/// Time-limited caches for player scripts and their signature operations.
///
/// Owned by the handler that uses it and shared between concurrent
/// extractions. Script bodies and operations are keyed by script path so
/// videos served by the same player reuse one fetch and one parse.
pub struct PlayerCache {
    by_video: TtlCache<PlayerScript>,
    scripts: TtlCache<Arc<str>>,
    operations: TtlCache<Arc<[CipherOp]>>,
}

impl Default for PlayerCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerCache {
    pub fn new() -> Self {
        Self::with_ttl(PLAYER_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            by_video: TtlCache::new(ttl),
            scripts: TtlCache::new(ttl),
            operations: TtlCache::new(ttl),
        }
    }

    /// Returns the player script for `video_id`, fetching the embed page and
    /// then the script only when no fresh entry exists.
    pub async fn script(
        &self,
        extractor: &Extractor,
        video_id: &str,
        options: &Options,
    ) -> Result<PlayerScript, ExtractorError> {
        self.by_video
            .get_or_try_insert_with(video_id, || async {
                let embed_url = format!("{BASE_URL}/embed/{video_id}?hl=en");
                let page = extractor.get_page(&embed_url, options).await?;
                let path = capture_group_1(&BASEJS_REGEX, &page)
                    .ok_or(ExtractorError::PatternNotFound("player script path"))?
                    .to_string();
                debug!(video_id, path = %path, "resolved player script");

                let js = self
                    .scripts
                    .get_or_try_insert_with(&path, || async {
                        let body = extractor
                            .get_page(&format!("{BASE_URL}{path}"), options)
                            .await?;
                        Ok::<_, ExtractorError>(Arc::from(body))
                    })
                    .await?;

                Ok::<_, ExtractorError>(PlayerScript { path, js })
            })
            .await
    }

    /// Signature operations of `script`, parsed once per script path.
    pub async fn operations(&self, script: &PlayerScript) -> Result<Arc<[CipherOp]>, ExtractorError> {
        self.operations
            .get_or_try_insert_with(&script.path, || async {
                let ops = parse_operations(&script.js)?;
                Ok::<_, ExtractorError>(Arc::from(ops))
            })
            .await
    }
}

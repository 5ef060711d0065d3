use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::{
    extractor::{
        error::ExtractorError,
        http::HttpFetcher,
        options::Options,
        platform_extractor::{Extractor, PlatformExtractor},
        utils::{capture_group_1, extract_title, name_and_ext},
    },
    media::{Data, DataType, Part, Stream},
};

pub static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://haokan\.baidu\.com/").unwrap());

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"property="og:title"\s+content="(.+?)""#).unwrap());
static VIDEO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<video\s*class="video"\s*src="?(.+?)"?\s*>"#).unwrap());

const SITE: &str = "好看视频 haokan.baidu.com";

pub struct Haokan {
    pub extractor: Extractor,
}

impl Haokan {
    const BASE_URL: &str = "https://haokan.baidu.com";

    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        let mut extractor = Extractor::new("Haokan", fetcher);
        extractor.set_referer_static(Self::BASE_URL);
        Self { extractor }
    }
}

#[async_trait]
impl PlatformExtractor for Haokan {
    fn get_extractor(&self) -> &Extractor {
        &self.extractor
    }

    async fn extract(&self, url: &str, options: &Options) -> Result<Vec<Data>, ExtractorError> {
        let page = self.extractor.get_page(url, options).await?;

        let title = capture_group_1(&TITLE_REGEX, &page)
            .map(ToOwned::to_owned)
            .or_else(|| extract_title(&page))
            .ok_or(ExtractorError::PatternNotFound("title"))?;
        let video_url = capture_group_1(&VIDEO_REGEX, &page)
            .ok_or(ExtractorError::PatternNotFound("video url"))?;

        let (_, ext) = name_and_ext(&url::Url::parse(video_url)?);
        let size = self.extractor.probe_size_or_zero(video_url).await;

        let stream = Stream::builder()
            .part(Part::new(video_url, size, ext))
            .size(size)
            .build();
        Ok(vec![
            Data::builder(url, SITE, title)
                .data_type(DataType::Video)
                .stream("default", stream)
                .build(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::test_utils::MockFetcher;

    #[tokio::test]
    async fn test_extract() {
        let url = "https://haokan.baidu.com/v?vid=123";
        let page = r#"<html><meta property="og:title" content="好看的视频"><div><video class="video" src="https://vd3.bdstatic.com/mda/x.mp4?auth=1"></video></div></html>"#;
        let fetcher = MockFetcher::new()
            .with_page(url, page)
            .with_size("https://vd3.bdstatic.com/mda/x.mp4?auth=1", 77);
        let haokan = Haokan::new(Arc::new(fetcher));

        let data = haokan.extract(url, &Options::default()).await.unwrap();
        assert!(URL_REGEX.is_match(url));
        assert_eq!(data[0].title, "好看的视频");
        let part = &data[0].streams["default"].parts[0];
        assert_eq!(part.url, "https://vd3.bdstatic.com/mda/x.mp4?auth=1");
        assert_eq!(part.ext, "mp4");
        assert_eq!(part.size, 77);
    }

    #[tokio::test]
    async fn test_missing_video() {
        let url = "https://haokan.baidu.com/v?vid=1";
        let fetcher = MockFetcher::new().with_page(url, r#"<meta property="og:title" content="t">"#);
        let haokan = Haokan::new(Arc::new(fetcher));
        assert!(matches!(
            haokan.extract(url, &Options::default()).await,
            Err(ExtractorError::PatternNotFound("video url"))
        ));
    }
}

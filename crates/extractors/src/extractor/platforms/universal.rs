use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    extractor::{
        error::ExtractorError,
        http::HttpFetcher,
        options::Options,
        platform_extractor::{Extractor, PlatformExtractor},
        utils::name_and_ext,
    },
    media::{Data, DataType, Part, Stream},
};

const SITE: &str = "Universal";

/// Fallback handler treating the URL itself as a direct media link.
pub struct Universal {
    pub extractor: Extractor,
}

impl Universal {
    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            extractor: Extractor::new("Universal", fetcher),
        }
    }
}

#[async_trait]
impl PlatformExtractor for Universal {
    fn get_extractor(&self) -> &Extractor {
        &self.extractor
    }

    async fn extract(&self, url: &str, _options: &Options) -> Result<Vec<Data>, ExtractorError> {
        let parsed = url::Url::parse(url)?;
        let (name, mut ext) = name_and_ext(&parsed);

        let fetcher = &self.extractor.fetcher;
        let content_type = fetcher.content_type(url, None).await?;
        if ext.is_empty()
            && let Some((_, subtype)) = content_type.split_once('/')
        {
            ext = subtype.to_string();
        }
        let size = self.extractor.probe_size_or_zero(url).await;
        debug!(url, content_type = %content_type, size, "direct link");

        let data_type = DataType::from_content_type(&content_type).unwrap_or_default();
        let title = if name.is_empty() {
            parsed.host_str().unwrap_or(url).to_string()
        } else {
            name
        };

        let stream = Stream::builder()
            .part(Part::new(url, size, ext))
            .size(size)
            .build();
        Ok(vec![
            Data::builder(url, SITE, title)
                .data_type(data_type)
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
    async fn test_direct_link() {
        let url = "https://cdn.example.com/media/clip.MP4?token=1";
        let fetcher = MockFetcher::new()
            .with_content_type(url, "video/mp4")
            .with_size(url, 2048);
        let universal = Universal::new(Arc::new(fetcher));

        let mut data = universal.extract(url, &Options::default()).await.unwrap();
        let data = &mut data[0];
        data.normalize();
        assert_eq!(data.title, "clip");
        assert_eq!(data.site, SITE);
        assert_eq!(data.data_type, DataType::Video);

        let stream = &data.streams["default"];
        assert_eq!(stream.parts[0].ext, "mp4");
        assert_eq!(stream.size, 2048);
        assert_eq!(stream.quality, "default");
    }

    #[tokio::test]
    async fn test_ext_from_content_type() {
        let url = "https://img.example.com/avatar";
        let fetcher = MockFetcher::new().with_content_type(url, "image/png");
        let universal = Universal::new(Arc::new(fetcher));

        let data = universal.extract(url, &Options::default()).await.unwrap();
        assert_eq!(data[0].data_type, DataType::Image);
        assert_eq!(data[0].title, "avatar");
        let stream = &data[0].streams["default"];
        assert_eq!(stream.parts[0].ext, "png");
        // size probe failed, reported as unknown
        assert_eq!(stream.size, 0);
    }
}

use std::{
    collections::BTreeMap,
    sync::{Arc, LazyLock},
};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::models::{DashMedia, InitialState, PlayInfo, PlayInfoData};
use crate::{
    extractor::{
        error::ExtractorError,
        http::HttpFetcher,
        options::Options,
        platform_extractor::{Extractor, PlatformExtractor},
        playlist::BatchExtractor,
        utils::{
            capture_group_1, capture_group_1_or_invalid_url, extract_title, name_and_ext,
            parse_embedded_json,
        },
    },
    media::{Data, DataType, Part, Stream},
};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.|m\.)?bilibili\.com/(?:video|bangumi/play)/").unwrap()
});

static VIDEO_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/video/((?:av\d+|BV[0-9A-Za-z]+))").unwrap());
static PAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?&]p=(\d+)").unwrap());

static PLAYINFO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"window\.__playinfo__\s*=\s*\{").unwrap());
static INITIAL_STATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"window\.__INITIAL_STATE__\s*=\s*\{").unwrap());

const SITE: &str = "哔哩哔哩 bilibili.com";

pub struct Bilibili {
    pub extractor: Extractor,
}

impl Bilibili {
    const BASE_URL: &str = "https://www.bilibili.com";

    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        let mut extractor = Extractor::new("Bilibili", fetcher);
        extractor.set_referer_static(Self::BASE_URL);
        Self { extractor }
    }

    fn page_url(video_id: &str, page: u32) -> String {
        format!("{}/video/{video_id}?p={page}", Self::BASE_URL)
    }

    async fn extract_playlist(
        &self,
        url: &str,
        options: &Options,
    ) -> Result<Vec<Data>, ExtractorError> {
        let video_id = capture_group_1_or_invalid_url(&VIDEO_ID_REGEX, url)?;
        let page = self.extractor.get_page(url, options).await?;
        let state: InitialState =
            parse_embedded_json(&page, &INITIAL_STATE_REGEX, "__INITIAL_STATE__")?;

        let video_id = match state.video_data.bvid.as_str() {
            "" => video_id,
            bvid => bvid,
        };
        let urls: Vec<String> = state
            .video_data
            .pages
            .iter()
            .map(|p| Self::page_url(video_id, p.page))
            .collect();
        if urls.len() <= 1 {
            return Ok(vec![self.extract_single(url, &page)?.with_sizes(self).await]);
        }

        let urls = options.select(urls);
        debug!(video_id, items = urls.len(), "extracting bilibili multi-page video");

        let results = BatchExtractor::from_options(options)
            .run(urls, |url| async move {
                let page = self.extractor.get_page(&url, options).await?;
                Ok::<_, ExtractorError>(self.extract_single(&url, &page)?.with_sizes(self).await)
            })
            .await;
        Ok(results)
    }

    /// Builds the data of a single video page. Part sizes of dash tracks are
    /// filled afterwards by [`PendingData::with_sizes`].
    fn extract_single(&self, url: &str, page: &str) -> Result<PendingData, ExtractorError> {
        let playinfo: PlayInfo = parse_embedded_json(page, &PLAYINFO_REGEX, "__playinfo__")?;
        if playinfo.code != 0 {
            return Err(ExtractorError::ValidationError(format!(
                "playinfo code {}",
                playinfo.code
            )));
        }

        let title = Self::title(url, page);
        let info = &playinfo.data;

        let streams = if !info.durl.is_empty() {
            Self::durl_streams(info)
        } else if let Some(dash) = &info.dash {
            Self::dash_streams(info, &dash.video, &dash.audio)
        } else {
            BTreeMap::new()
        };
        if streams.is_empty() {
            return Err(ExtractorError::NoStreamsFound);
        }

        Ok(PendingData(
            Data::builder(url, SITE, title)
                .data_type(DataType::Video)
                .streams(streams)
                .build(),
        ))
    }

    fn title(url: &str, page: &str) -> String {
        let state = parse_embedded_json::<InitialState>(page, &INITIAL_STATE_REGEX, "__INITIAL_STATE__")
            .ok()
            .map(|s| s.video_data)
            .filter(|v| !v.title.is_empty());

        let Some(video) = state else {
            return extract_title(page).unwrap_or_default();
        };
        if video.pages.len() <= 1 {
            return video.title;
        }

        let current: u32 = capture_group_1(&PAGE_REGEX, url)
            .and_then(|p| p.parse().ok())
            .unwrap_or(1);
        match video.pages.iter().find(|p| p.page == current) {
            Some(p) => format!("{} P{} {}", video.title, p.page, p.part),
            None => video.title,
        }
    }

    // Legacy layout: one stream of sequential segments with known sizes.
    fn durl_streams(info: &PlayInfoData) -> BTreeMap<String, Stream> {
        let mut segments: Vec<_> = info.durl.iter().collect();
        segments.sort_by_key(|d| d.order);

        let parts = segments
            .into_iter()
            .map(|d| {
                let ext = url::Url::parse(&d.url)
                    .map(|u| name_and_ext(&u).1)
                    .unwrap_or_default();
                Part::new(d.url.clone(), d.size, ext)
            })
            .collect();

        let mut streams = BTreeMap::new();
        streams.insert(
            info.quality.to_string(),
            Stream::builder()
                .quality(info.quality_label(info.quality))
                .parts(parts)
                .build(),
        );
        streams
    }

    // Dash layout: every video track muxed with the best audio track.
    fn dash_streams(
        info: &PlayInfoData,
        video: &[DashMedia],
        audio: &[DashMedia],
    ) -> BTreeMap<String, Stream> {
        let best_audio = audio.iter().max_by_key(|a| a.bandwidth);

        let mut best_video: BTreeMap<u32, &DashMedia> = BTreeMap::new();
        for v in video {
            let entry = best_video.entry(v.id).or_insert(v);
            if v.bandwidth > entry.bandwidth {
                *entry = v;
            }
        }

        best_video
            .into_values()
            .map(|v| {
                let mut stream = Stream::builder()
                    .id(v.id.to_string())
                    .quality(format!("{} {}", info.quality_label(v.id), v.codecs))
                    .ext("mp4")
                    .part(Part::new(v.url(), 0, "m4s"));
                if let Some(a) = best_audio {
                    stream = stream.part(Part::new(a.url(), 0, "m4s")).need_mux(true);
                }
                (v.id.to_string(), stream.build())
            })
            .collect()
    }
}

/// Data whose part sizes may still be unknown.
struct PendingData(Data);

impl PendingData {
    async fn with_sizes(self, bilibili: &Bilibili) -> Data {
        let mut data = self.0;
        for stream in data.streams.values_mut() {
            for part in stream.parts.iter_mut().filter(|p| p.size == 0) {
                part.size = bilibili.extractor.probe_size_or_zero(&part.url).await;
            }
        }
        data
    }
}

#[async_trait]
impl PlatformExtractor for Bilibili {
    fn get_extractor(&self) -> &Extractor {
        &self.extractor
    }

    async fn extract(&self, url: &str, options: &Options) -> Result<Vec<Data>, ExtractorError> {
        if options.playlist && VIDEO_ID_REGEX.is_match(url) {
            return self.extract_playlist(url, options).await;
        }
        let page = self.extractor.get_page(url, options).await?;
        Ok(vec![self.extract_single(url, &page)?.with_sizes(self).await])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::test_utils::MockFetcher;

    const DURL_PAGE: &str = r#"<html><head><title>fallback</title></head><script>window.__playinfo__={"code":0,"data":{"quality":80,"accept_quality":[80,64],"accept_description":["高清 1080P","高清 720P"],"durl":[{"order":2,"url":"https://upos.bilivideo.com/2.flv?e=1","size":200},{"order":1,"url":"https://upos.bilivideo.com/1.flv?e=1","size":100}]}}</script><script>window.__INITIAL_STATE__={"videoData":{"bvid":"BV1xx411c7mD","title":"Durl video","pages":[{"page":1,"part":"p1"}]}};(function(){}())</script></html>"#;

    fn dash_page(title: &str) -> String {
        format!(
            r#"<script>window.__playinfo__={{"code":0,"data":{{"quality":80,"accept_quality":[80,64],"accept_description":["高清 1080P","高清 720P"],"dash":{{"video":[{{"id":80,"base_url":"https://upos/80-avc.m4s","bandwidth":100,"codecs":"avc1"}},{{"id":80,"baseUrl":"https://upos/80-hev.m4s","bandwidth":200,"codecs":"hev1"}},{{"id":64,"base_url":"https://upos/64.m4s","bandwidth":50,"codecs":"avc1"}}],"audio":[{{"id":30216,"base_url":"https://upos/a1.m4s","bandwidth":10}},{{"id":30280,"base_url":"https://upos/a2.m4s","bandwidth":30}}]}}}}}}</script><script>window.__INITIAL_STATE__={{"videoData":{{"bvid":"BV1ab","title":"{title}","pages":[{{"page":1,"part":"intro"}},{{"page":2,"part":"main"}}]}}}};(function(){{}}())</script>"#
        )
    }

    #[tokio::test]
    async fn test_durl_segments() {
        let url = "https://www.bilibili.com/video/BV1xx411c7mD";
        let bilibili = Bilibili::new(Arc::new(MockFetcher::new().with_page(url, DURL_PAGE)));

        let mut data = bilibili.extract(url, &Options::default()).await.unwrap();
        assert_eq!(data.len(), 1);
        let data = &mut data[0];
        data.normalize();

        assert_eq!(data.title, "Durl video");
        let stream = &data.streams["80"];
        assert_eq!(stream.quality, "高清 1080P");
        assert_eq!(stream.parts.len(), 2);
        assert_eq!(stream.parts[0].url, "https://upos.bilivideo.com/1.flv?e=1");
        assert_eq!(stream.ext, "mp4");
        assert_eq!(stream.size, 300);
        assert!(!stream.need_mux);
    }

    #[tokio::test]
    async fn test_dash_tracks() {
        let url = "https://www.bilibili.com/video/BV1ab?p=2";
        let fetcher = MockFetcher::new()
            .with_page(url, dash_page("Dash video"))
            .with_size("https://upos/80-hev.m4s", 1000)
            .with_size("https://upos/a2.m4s", 10);
        let bilibili = Bilibili::new(Arc::new(fetcher));

        let mut data = bilibili.extract(url, &Options::default()).await.unwrap();
        let data = &mut data[0];
        data.normalize();

        assert_eq!(data.title, "Dash video P2 main");
        assert_eq!(data.streams.len(), 2);

        let best = &data.streams["80"];
        assert!(best.need_mux);
        assert_eq!(best.parts[0].url, "https://upos/80-hev.m4s");
        assert_eq!(best.parts[1].url, "https://upos/a2.m4s");
        assert_eq!(best.quality, "高清 1080P hev1");
        assert_eq!(best.ext, "mp4");
        assert_eq!(best.size, 1010);

        // unknown sizes stay 0
        assert_eq!(data.streams["64"].size, 10);
    }

    #[tokio::test]
    async fn test_multi_page_playlist() {
        let url = "https://www.bilibili.com/video/BV1ab";
        let fetcher = MockFetcher::new()
            .with_page(url, dash_page("Series"))
            .with_page("https://www.bilibili.com/video/BV1ab?p=1", dash_page("Series"));
        let bilibili = Bilibili::new(Arc::new(fetcher));
        let options = Options {
            playlist: true,
            thread_number: 2,
            ..Default::default()
        };

        let data = bilibili.extract(url, &options).await.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].title, "Series P1 intro");
        // second page is not served by the mock
        assert_eq!(data[1].url, "https://www.bilibili.com/video/BV1ab?p=2");
        assert!(data[1].is_err());
    }

    #[test]
    fn test_url_regex() {
        assert!(URL_REGEX.is_match("https://www.bilibili.com/video/BV1xx411c7mD"));
        assert!(URL_REGEX.is_match("https://www.bilibili.com/bangumi/play/ep12345"));
    }
}

use std::{
    collections::BTreeMap,
    sync::{Arc, LazyLock},
};

use async_trait::async_trait;
use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use super::{
    cipher::{CipherOp, apply_operations},
    models::{Format, PlayerResponse},
    player::PlayerCache,
};
use crate::{
    extractor::{
        error::ExtractorError,
        http::HttpFetcher,
        options::Options,
        platform_extractor::{Extractor, PlatformExtractor},
        playlist::BatchExtractor,
        utils::{capture_group_1, extract_title, match_one_of, parse_embedded_json},
    },
    media::{Data, DataType, Part, Stream},
};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.|m\.|music\.)?(?:youtube\.com|youtu\.be)/").unwrap()
});

static WATCH_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"watch\?(?:.*&)?v=([^/&#]+)").unwrap());
static SHORT_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtu\.be/([^?/#]+)").unwrap());
static EMBED_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:embed|shorts|v)/([^/?#]+)").unwrap());

static LIST_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&](?:list|p)=([^/&#]+)").unwrap());
static PLAYLIST_VIDEO_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""videoId":"([^,"]+?)","thumbnail""#).unwrap());

static PLAYER_RESPONSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ytInitialPlayerResponse\s*=\s*\{").unwrap());

const SITE: &str = "YouTube youtube.com";
const AUDIO_QUALITY_MEDIUM: &str = "AUDIO_QUALITY_MEDIUM";

pub struct Youtube {
    pub extractor: Extractor,
    player: Arc<PlayerCache>,
}

impl Youtube {
    const BASE_URL: &str = "https://www.youtube.com";

    pub fn new(fetcher: Arc<dyn HttpFetcher>, player: Arc<PlayerCache>) -> Self {
        let mut extractor = Extractor::new("YouTube", fetcher);
        extractor.set_referer_static(Self::BASE_URL);
        Self { extractor, player }
    }

    pub fn extract_video_id(url: &str) -> Result<&str, ExtractorError> {
        match_one_of(url, &[&*WATCH_ID_REGEX, &*SHORT_ID_REGEX, &*EMBED_ID_REGEX])
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| ExtractorError::InvalidUrl(url.to_string()))
    }

    fn watch_url(video_id: &str) -> String {
        format!("{}/watch?v={video_id}", Self::BASE_URL)
    }

    async fn extract_video(&self, url: &str, options: &Options) -> Result<Data, ExtractorError> {
        let video_id = Self::extract_video_id(url)?;
        let page = self
            .extractor
            .get_page(&Self::watch_url(video_id), options)
            .await?;
        let response: PlayerResponse =
            parse_embedded_json(&page, &PLAYER_RESPONSE_REGEX, "ytInitialPlayerResponse")?;

        match response.playability_status.status.as_str() {
            "" | "OK" => {}
            "LOGIN_REQUIRED" => return Err(ExtractorError::LoginRequired),
            status => {
                let reason = response
                    .playability_status
                    .reason
                    .clone()
                    .unwrap_or_else(|| status.to_string());
                return Err(ExtractorError::ValidationError(reason));
            }
        }

        let title = Some(response.video_details.title.trim())
            .filter(|t| !t.is_empty())
            .map(ToOwned::to_owned)
            .or_else(|| extract_title(&page))
            .unwrap_or_else(|| video_id.to_string());

        let streams = self.build_streams(video_id, &response, options).await?;

        Ok(Data::builder(url, SITE, title)
            .data_type(DataType::Video)
            .streams(streams)
            .build())
    }

    async fn extract_playlist(
        &self,
        list_id: &str,
        options: &Options,
    ) -> Result<Vec<Data>, ExtractorError> {
        let page_url = format!("{}/playlist?list={list_id}", Self::BASE_URL);
        let page = self.extractor.get_page(&page_url, options).await?;

        let mut seen = FxHashSet::default();
        let urls: Vec<String> = PLAYLIST_VIDEO_ID_REGEX
            .captures_iter(&page)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .filter(|id| seen.insert(*id))
            .map(Self::watch_url)
            .collect();
        if urls.is_empty() {
            return Err(ExtractorError::PatternNotFound("playlist video ids"));
        }

        let urls = options.select(urls);
        debug!(list_id, items = urls.len(), "extracting youtube playlist");

        let results = BatchExtractor::from_options(options)
            .run(urls, |url| async move { self.extract_video(&url, options).await })
            .await;
        Ok(results)
    }

    async fn build_streams(
        &self,
        video_id: &str,
        response: &PlayerResponse,
        options: &Options,
    ) -> Result<BTreeMap<String, Stream>, ExtractorError> {
        let data = &response.streaming_data;
        let mut streams = BTreeMap::new();

        let audio_m4a = self
            .best_audio_part(video_id, &data.adaptive_formats, "mp4", options)
            .await?;
        let audio_webm = self
            .best_audio_part(video_id, &data.adaptive_formats, "webm", options)
            .await?;

        let progressive = data.formats.iter().map(|f| (f, false));
        let adaptive = data.adaptive_formats.iter().map(|f| (f, true));
        for (format, is_adaptive) in progressive.chain(adaptive) {
            if !format.has_source() {
                warn!(itag = format.itag, "format has no url, skipping");
                continue;
            }
            let part = self.format_part(video_id, format, options).await?;

            let mut stream = Stream::builder()
                .id(format.itag.to_string())
                .quality(format.quality())
                .ext(format.container())
                .part(part);

            // video-only formats are muxed with audio of the same container
            if is_adaptive && !format.is_audio() {
                let audio = match format.container() {
                    "mp4" => audio_m4a.as_ref(),
                    "webm" => audio_webm.as_ref(),
                    _ => None,
                };
                if let Some(audio) = audio {
                    stream = stream.part(audio.clone()).need_mux(true);
                }
            }

            streams.insert(format.itag.to_string(), stream.build());
        }

        if streams.is_empty() {
            return Err(ExtractorError::NoStreamsFound);
        }
        Ok(streams)
    }

    async fn best_audio_part(
        &self,
        video_id: &str,
        formats: &[Format],
        container: &str,
        options: &Options,
    ) -> Result<Option<Part>, ExtractorError> {
        let candidates = formats
            .iter()
            .filter(|f| f.is_audio() && f.has_source() && f.container() == container);
        let best = candidates
            .clone()
            .find(|f| f.audio_quality.as_deref() == Some(AUDIO_QUALITY_MEDIUM))
            .or_else(|| candidates.max_by_key(|f| f.bitrate));

        match best {
            Some(best) => Ok(Some(self.format_part(video_id, best, options).await?)),
            None => Ok(None),
        }
    }

    async fn format_part(
        &self,
        video_id: &str,
        format: &Format,
        options: &Options,
    ) -> Result<Part, ExtractorError> {
        let url = self.resolve_url(video_id, format, options).await?;
        let size = match format.content_length() {
            Some(size) => size,
            None => self.extractor.probe_size_or_zero(&url).await,
        };
        Ok(Part::new(url, size, format.part_ext()))
    }

    async fn cipher_operations(
        &self,
        video_id: &str,
        options: &Options,
    ) -> Result<Arc<[CipherOp]>, ExtractorError> {
        let script = self
            .player
            .script(&self.extractor, video_id, options)
            .await?;
        self.player.operations(&script).await
    }

    /// Direct URL of `format`, deciphering its signature when needed.
    async fn resolve_url(
        &self,
        video_id: &str,
        format: &Format,
        options: &Options,
    ) -> Result<String, ExtractorError> {
        if let Some(url) = format.url.as_deref().filter(|u| !u.is_empty()) {
            return Ok(url.to_string());
        }

        let cipher = format.signature_cipher.as_deref().ok_or_else(|| {
            ExtractorError::ValidationError(format!("format {} has no url", format.itag))
        })?;

        let mut signature = None;
        let mut param = "signature".to_string();
        let mut base = None;
        for (key, value) in url::form_urlencoded::parse(cipher.as_bytes()) {
            match key.as_ref() {
                "s" => signature = Some(value.into_owned()),
                "sp" => param = value.into_owned(),
                "url" => base = Some(value.into_owned()),
                _ => {}
            }
        }
        let (Some(signature), Some(base)) = (signature, base) else {
            return Err(ExtractorError::ValidationError(format!(
                "format {} has an incomplete signature cipher",
                format.itag
            )));
        };

        let ops = self.cipher_operations(video_id, options).await?;
        let mut url = url::Url::parse(&base)?;
        url.query_pairs_mut()
            .append_pair(&param, &apply_operations(&ops, &signature));
        Ok(url.into())
    }
}

#[async_trait]
impl PlatformExtractor for Youtube {
    fn get_extractor(&self) -> &Extractor {
        &self.extractor
    }

    async fn extract(&self, url: &str, options: &Options) -> Result<Vec<Data>, ExtractorError> {
        if options.playlist
            && let Some(list_id) = capture_group_1(&LIST_ID_REGEX, url)
        {
            return self.extract_playlist(list_id, options).await;
        }
        Ok(vec![self.extract_video(url, options).await?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{
        platforms::youtube::cipher::CipherError, test_utils::MockFetcher,
    };

    const WATCH_PAGE: &str = r##"<html><head><title>Test video - YouTube</title></head><script>var ytInitialPlayerResponse = {"playabilityStatus":{"status":"OK"},"videoDetails":{"videoId":"abc123","title":"Test video"},"streamingData":{"formats":[{"itag":18,"url":"https://rr.googlevideo.com/18","mimeType":"video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"","qualityLabel":"360p","contentLength":"1000"}],"adaptiveFormats":[{"itag":137,"signatureCipher":"s=ABCDEFGH&sp=sig&url=https%3A%2F%2Frr.googlevideo.com%2F137%3Fid%3D1","mimeType":"video/mp4; codecs=\"avc1.640028\"","qualityLabel":"1080p","contentLength":"5000"},{"itag":140,"url":"https://rr.googlevideo.com/140","mimeType":"audio/mp4; codecs=\"mp4a.40.2\"","audioQuality":"AUDIO_QUALITY_MEDIUM","bitrate":128000,"contentLength":"300"}]}};var meta = document.createElement('meta');</script></html>"##;

    const EMBED_PAGE: &str = r#"<script src="/s/player/abcd1234/player_ias.vflset/en_US/base.js"></script>"#;

    const PLAYER_SCRIPT: &str = r#"var Xq={Ab:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c},
$z:function(a,b){a.splice(0,b)},
k9:function(a){a.reverse()}};
Qa=function(a){a=a.split("");Xq.Ab(a,3);Xq.$z(a,2);Xq.k9(a,44);return a.join("")};"#;

    fn fetcher() -> Arc<MockFetcher> {
        Arc::new(
            MockFetcher::new()
                .with_page("https://www.youtube.com/watch?v=abc123", WATCH_PAGE)
                .with_page("https://www.youtube.com/embed/abc123?hl=en", EMBED_PAGE)
                .with_page(
                    "https://www.youtube.com/s/player/abcd1234/player_ias.vflset/en_US/base.js",
                    PLAYER_SCRIPT,
                )
                .with_page(
                    "https://www.youtube.com/playlist?list=PL1",
                    r#"{"videoId":"abc123","thumbnail":{}},{"videoId":"abc123","thumbnail":{}},{"videoId":"gone99","thumbnail":{}}"#,
                ),
        )
    }

    #[test]
    fn test_extract_video_id() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=1", "dQw4w9WgXcQ"),
            ("https://youtu.be/dQw4w9WgXcQ?t=3", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/embed/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/shorts/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
        ];
        for (url, id) in cases {
            assert_eq!(Youtube::extract_video_id(url).unwrap(), id, "{url}");
        }
        assert!(Youtube::extract_video_id("https://www.youtube.com/").is_err());
        assert!(URL_REGEX.is_match("https://youtu.be/dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn test_extract_video_with_cipher() {
        let fetcher = fetcher();
        let youtube = Youtube::new(fetcher.clone(), Arc::new(PlayerCache::new()));
        let options = Options::default();

        let mut data = youtube
            .extract("https://www.youtube.com/watch?v=abc123", &options)
            .await
            .unwrap();
        assert_eq!(data.len(), 1);
        let data = &mut data[0];
        data.normalize();

        assert_eq!(data.title, "Test video");
        assert_eq!(data.site, SITE);
        assert_eq!(data.streams.len(), 3);

        let progressive = &data.streams["18"];
        assert_eq!(progressive.parts.len(), 1);
        assert!(!progressive.need_mux);
        assert_eq!(progressive.size, 1000);
        assert_eq!(progressive.quality, "360p video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"");

        let adaptive = &data.streams["137"];
        assert!(adaptive.need_mux);
        assert_eq!(adaptive.ext, "mp4");
        assert_eq!(adaptive.parts.len(), 2);
        assert_eq!(
            adaptive.parts[0].url,
            "https://rr.googlevideo.com/137?id=1&sig=HGFEAC"
        );
        assert_eq!(adaptive.parts[1].url, "https://rr.googlevideo.com/140");
        assert_eq!(adaptive.parts[1].ext, "m4a");
        assert_eq!(adaptive.size, 5300);

        let audio = &data.streams["140"];
        assert_eq!(audio.parts.len(), 1);
        assert!(!audio.need_mux);

        // the player script is fetched once per video within the cache lifetime
        youtube
            .extract("https://youtu.be/abc123", &options)
            .await
            .unwrap();
        assert_eq!(fetcher.hits("https://www.youtube.com/embed/abc123?hl=en"), 1);
    }

    #[tokio::test]
    async fn test_extract_playlist() {
        let youtube = Youtube::new(fetcher(), Arc::new(PlayerCache::new()));
        let options = Options {
            playlist: true,
            thread_number: 2,
            ..Default::default()
        };

        let data = youtube
            .extract("https://www.youtube.com/watch?v=abc123&list=PL1", &options)
            .await
            .unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].title, "Test video");
        assert!(!data[0].is_err());
        assert_eq!(data[1].url, "https://www.youtube.com/watch?v=gone99");
        assert!(data[1].is_err());
    }

    #[tokio::test]
    async fn test_login_required() {
        let page = r#"<script>var ytInitialPlayerResponse = {"playabilityStatus":{"status":"LOGIN_REQUIRED","reason":"Sign in"}};</script>"#;
        let fetcher = MockFetcher::new().with_page("https://www.youtube.com/watch?v=priv", page);
        let youtube = Youtube::new(Arc::new(fetcher), Arc::new(PlayerCache::new()));
        let err = youtube
            .extract("https://www.youtube.com/watch?v=priv", &Options::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractorError::LoginRequired));
    }

    const SIGNED_137: &str = r#"{"itag":137,"signatureCipher":"s=ABCDEFGH&sp=sig&url=https%3A%2F%2Frr.googlevideo.com%2F137%3Fid%3D1","mimeType":"video/mp4","qualityLabel":"1080p","contentLength":"5000"}"#;

    fn watch_page(video_id: &str, formats: &str, adaptive: &str) -> String {
        format!(
            r#"<script>var ytInitialPlayerResponse = {{"playabilityStatus":{{"status":"OK"}},"videoDetails":{{"videoId":"{video_id}","title":"Clip {video_id}"}},"streamingData":{{"formats":[{formats}],"adaptiveFormats":[{adaptive}]}}}};</script>"#
        )
    }

    fn youtube_with(video_id: &str, page: String, script: &str) -> Youtube {
        let fetcher = MockFetcher::new()
            .with_page(&format!("https://www.youtube.com/watch?v={video_id}"), page)
            .with_page(&format!("https://www.youtube.com/embed/{video_id}?hl=en"), EMBED_PAGE)
            .with_page(
                "https://www.youtube.com/s/player/abcd1234/player_ias.vflset/en_US/base.js",
                script,
            );
        Youtube::new(Arc::new(fetcher), Arc::new(PlayerCache::new()))
    }

    #[tokio::test]
    async fn test_unparsable_player_script_fails_video() {
        let progressive = r#"{"itag":18,"url":"https://rr.googlevideo.com/18","mimeType":"video/mp4","contentLength":"1000"}"#;
        let youtube = youtube_with(
            "brk001",
            watch_page("brk001", progressive, SIGNED_137),
            "var nothing={};function f(a){return a}",
        );

        let err = youtube
            .extract("https://www.youtube.com/watch?v=brk001", &Options::default())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ExtractorError::Cipher(CipherError::ActionsObjectNotFound)),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_script_without_operations_keeps_signature() {
        let script = r#"var Xq={k9:function(a){a.reverse()}};
Qa=function(a){a=a.split("");Zz.k9(a,1);return a.join("")};"#;
        let youtube = youtube_with("noop01", watch_page("noop01", "", SIGNED_137), script);

        let data = youtube
            .extract("https://www.youtube.com/watch?v=noop01", &Options::default())
            .await
            .unwrap();
        let stream = &data[0].streams["137"];
        assert_eq!(stream.parts.len(), 1);
        assert_eq!(
            stream.parts[0].url,
            "https://rr.googlevideo.com/137?id=1&sig=ABCDEFGH"
        );
    }

    #[tokio::test]
    async fn test_audio_paired_by_container() {
        let mp4_video = r#"{"itag":137,"url":"https://rr.googlevideo.com/137","mimeType":"video/mp4","contentLength":"5000"}"#;
        let webm_video = r#"{"itag":248,"url":"https://rr.googlevideo.com/248","mimeType":"video/webm","contentLength":"4000"}"#;
        let m4a = r#"{"itag":140,"url":"https://rr.googlevideo.com/140","mimeType":"audio/mp4","audioQuality":"AUDIO_QUALITY_MEDIUM","contentLength":"300"}"#;
        let webm_audio = r#"{"itag":251,"url":"https://rr.googlevideo.com/251","mimeType":"audio/webm","audioQuality":"AUDIO_QUALITY_MEDIUM","contentLength":"200"}"#;

        // no webm audio: the webm video stays video-only
        let adaptive = [mp4_video, webm_video, m4a].join(",");
        let youtube = youtube_with("pair01", watch_page("pair01", "", &adaptive), PLAYER_SCRIPT);
        let data = youtube
            .extract("https://www.youtube.com/watch?v=pair01", &Options::default())
            .await
            .unwrap();
        let streams = &data[0].streams;
        let exts: Vec<&str> = streams["137"].parts.iter().map(|p| p.ext.as_str()).collect();
        assert_eq!(exts, ["mp4", "m4a"]);
        assert!(streams["137"].need_mux);
        assert_eq!(streams["248"].parts.len(), 1);
        assert!(!streams["248"].need_mux);
        assert_eq!(streams["248"].ext, "webm");

        let adaptive = [mp4_video, webm_video, m4a, webm_audio].join(",");
        let youtube = youtube_with("pair02", watch_page("pair02", "", &adaptive), PLAYER_SCRIPT);
        let data = youtube
            .extract("https://www.youtube.com/watch?v=pair02", &Options::default())
            .await
            .unwrap();
        let webm = &data[0].streams["248"];
        assert!(webm.need_mux);
        assert_eq!(webm.parts[1].url, "https://rr.googlevideo.com/251");
        assert_eq!(webm.parts[1].ext, "webm");
        assert_eq!(data[0].streams["137"].parts[1].url, "https://rr.googlevideo.com/140");
    }

    #[tokio::test]
    async fn test_format_without_source_is_skipped() {
        let bare = r#"{"itag":22,"mimeType":"video/mp4"}"#;
        let plain = r#"{"itag":18,"url":"https://rr.googlevideo.com/18","mimeType":"video/mp4","contentLength":"1000"}"#;
        let youtube = youtube_with(
            "bare01",
            watch_page("bare01", &[bare, plain].join(","), ""),
            PLAYER_SCRIPT,
        );
        let data = youtube
            .extract("https://www.youtube.com/watch?v=bare01", &Options::default())
            .await
            .unwrap();
        assert_eq!(data[0].streams.keys().collect::<Vec<_>>(), ["18"]);
    }

    #[tokio::test]
    #[ignore]
    async fn test_extract_live() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let registry = crate::extractor::default::default_registry().unwrap();
        let data = registry
            .extract("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &Options::default())
            .await
            .unwrap();
        println!("{data:?}");
    }
}

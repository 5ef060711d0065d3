use serde::Deserialize;

/// `window.__playinfo__` embedded in video pages.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PlayInfo {
    pub code: i64,
    pub data: PlayInfoData,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PlayInfoData {
    pub quality: u32,
    pub accept_quality: Vec<u32>,
    pub accept_description: Vec<String>,
    // Segmented flv/mp4 layout
    pub durl: Vec<Durl>,
    // Separate video and audio tracks
    pub dash: Option<Dash>,
}

impl PlayInfoData {
    /// Human readable label of a quality id, e.g. 80 -> "高清 1080P".
    pub fn quality_label(&self, id: u32) -> String {
        self.accept_quality
            .iter()
            .position(|q| *q == id)
            .and_then(|i| self.accept_description.get(i))
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Durl {
    pub order: u32,
    pub url: String,
    pub size: u64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Dash {
    pub video: Vec<DashMedia>,
    pub audio: Vec<DashMedia>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DashMedia {
    pub id: u32,
    pub base_url: String,
    #[serde(rename = "baseUrl")]
    pub base_url_camel: String,
    pub bandwidth: u64,
    pub codecs: String,
}

impl DashMedia {
    pub fn url(&self) -> &str {
        if self.base_url.is_empty() {
            &self.base_url_camel
        } else {
            &self.base_url
        }
    }
}

/// `window.__INITIAL_STATE__` embedded in video pages.
#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct InitialState {
    pub video_data: VideoData,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct VideoData {
    pub bvid: String,
    pub title: String,
    pub pages: Vec<VideoPage>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct VideoPage {
    pub page: u32,
    pub part: String,
}

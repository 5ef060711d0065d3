use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerResponse {
    pub playability_status: PlayabilityStatus,
    pub streaming_data: StreamingData,
    pub video_details: VideoDetails,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayabilityStatus {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingData {
    // Muxed audio+video formats
    pub formats: Vec<Format>,
    // Video-only and audio-only formats
    pub adaptive_formats: Vec<Format>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub author: String,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Format {
    pub itag: u32,
    pub url: Option<String>,
    // Query string with the scrambled signature `s`, its parameter name `sp` and the base `url`
    pub signature_cipher: Option<String>,
    pub mime_type: String,
    pub quality_label: Option<String>,
    pub bitrate: u64,
    pub content_length: Option<String>,
    pub audio_quality: Option<String>,
}

impl Format {
    /// Whether the format carries a direct url or a signature cipher.
    pub fn has_source(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.url) || present(&self.signature_cipher)
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    /// Container subtype of the MIME type: `video/webm; codecs=".."` -> `webm`.
    pub fn container(&self) -> &str {
        self.mime_type
            .split(';')
            .next()
            .and_then(|t| t.split_once('/'))
            .map(|(_, sub)| sub.trim())
            .unwrap_or_default()
    }

    /// File extension of a part downloaded from this format.
    pub fn part_ext(&self) -> &str {
        match (self.is_audio(), self.container()) {
            (true, "mp4") => "m4a",
            (_, container) => container,
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length.as_deref()?.parse().ok()
    }

    pub fn quality(&self) -> String {
        let label = if self.is_audio() {
            self.audio_quality.as_deref()
        } else {
            self.quality_label.as_deref()
        };
        match label {
            Some(label) if !label.is_empty() => format!("{} {}", label, self.mime_type),
            _ => self.mime_type.clone(),
        }
    }
}

use serde::{Serialize, Serializer};
use std::{collections::BTreeMap, fmt, sync::Arc};

use super::stream::{Part, Stream};
use crate::extractor::error::ExtractorError;

/// Kind of media described by a [`Data`].
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Video,
    Image,
    Audio,
}

impl DataType {
    /// Maps a MIME type such as `video/mp4` to its data type.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let (top, _) = content_type.split_once('/')?;
        match top.trim().to_ascii_lowercase().as_str() {
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Video => "video",
            Self::Image => "image",
            Self::Audio => "audio",
        };
        f.write_str(s)
    }
}

/// The result of extracting one media item from a page.
///
/// A failed playlist item is represented by a `Data` whose `err` is set and
/// whose `streams` is empty, see [`Data::from_error`].
///
/// # Examples
///
/// ```rust
/// use media_extractors::media::{Data, DataType, Part, Stream};
///
/// let data = Data::builder("https://example.com/v", "Example example.com", "A video")
///     .data_type(DataType::Video)
///     .stream("hd", Stream::builder().part(Part::new("https://cdn/1.flv", 10, "flv")).build())
///     .build();
/// assert_eq!(data.streams.len(), 1);
/// ```
#[derive(Serialize, Debug, Clone, Default)]
pub struct Data {
    // Source URL, after any rewriting done by the dispatcher
    pub url: String,
    // Human-readable site label, e.g. "YouTube youtube.com"
    pub site: String,
    pub title: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub streams: BTreeMap<String, Stream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<Part>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_err"
    )]
    pub err: Option<Arc<ExtractorError>>,
}

fn serialize_err<S: Serializer>(
    err: &Option<Arc<ExtractorError>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match err {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone)]
pub struct DataBuilder {
    url: String,
    site: String,
    title: String,
    data_type: DataType,
    streams: BTreeMap<String, Stream>,
}

impl Data {
    pub fn builder(
        url: impl Into<String>,
        site: impl Into<String>,
        title: impl Into<String>,
    ) -> DataBuilder {
        DataBuilder::new(url, site, title)
    }

    /// Builds the error placeholder used for a failed item: only `url` and
    /// `err` are meaningful.
    pub fn from_error(url: impl Into<String>, err: ExtractorError) -> Self {
        Self {
            url: url.into(),
            err: Some(Arc::new(err)),
            ..Default::default()
        }
    }

    pub fn is_err(&self) -> bool {
        self.err.is_some()
    }

    /// Fills the derived stream fields in place.
    ///
    /// For every `(key, stream)` entry: an empty `id` becomes `key`, an empty
    /// `quality` becomes `key`, for video data an empty `ext` is taken from
    /// the first part (with the raw segment containers `ts`, `flv` and `f4v`
    /// reported as `mp4`), and a zero `size` becomes the sum of the part
    /// sizes. Values set by the extractor are never overwritten, which makes
    /// the operation idempotent.
    pub fn normalize(&mut self) {
        for (key, stream) in self.streams.iter_mut() {
            if stream.id.is_empty() {
                stream.id = key.clone();
            }
            if stream.quality.is_empty() {
                stream.quality = key.clone();
            }
            if self.data_type == DataType::Video
                && stream.ext.is_empty()
                && let Some(first) = stream.parts.first()
            {
                stream.ext = merged_ext(&first.ext).to_owned();
            }
            if stream.size == 0 {
                stream.size = stream.parts_size();
            }
        }
    }

    /// Streams ordered from largest to smallest.
    pub fn sorted_streams(&self) -> Vec<&Stream> {
        let mut streams: Vec<&Stream> = self.streams.values().collect();
        streams.sort_by(|a, b| b.size.cmp(&a.size));
        streams
    }
}

// Raw segment containers are remuxed into mp4 on merge.
fn merged_ext(ext: &str) -> &str {
    match ext {
        "ts" | "flv" | "f4v" => "mp4",
        other => other,
    }
}

impl DataBuilder {
    pub fn new(url: impl Into<String>, site: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            site: site.into(),
            title: title.into(),
            data_type: DataType::default(),
            streams: BTreeMap::new(),
        }
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn stream(mut self, key: impl Into<String>, stream: Stream) -> Self {
        self.streams.insert(key.into(), stream);
        self
    }

    pub fn streams(mut self, streams: BTreeMap<String, Stream>) -> Self {
        self.streams = streams;
        self
    }

    pub fn build(self) -> Data {
        Data {
            url: self.url,
            site: self.site,
            title: self.title,
            data_type: self.data_type,
            streams: self.streams,
            caption: None,
            err: None,
        }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(err) = &self.err {
            return write!(f, "{}: {}", self.url, err);
        }
        writeln!(f, "Site:   {}", self.site)?;
        writeln!(f, "Title:  {}", self.title)?;
        write!(f, "Type:   {}", self.data_type)?;
        for stream in self.sorted_streams() {
            write!(f, "\n  {stream}")?;
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// One downloadable segment of a stream.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    pub url: String,
    // Size in bytes, 0 when unknown
    pub size: u64,
    pub ext: String,
}

impl Part {
    pub fn new(url: impl Into<String>, size: u64, ext: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            size,
            ext: ext.into(),
        }
    }
}

/// A single quality/format variant of a media item.
///
/// A stream is made of one or more [`Part`]s. When `need_mux` is set the parts
/// are separate tracks (usually video then audio) that must be merged after
/// download, otherwise they are sequential segments to be concatenated.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Stream {
    // Filled from the mapping key during normalization when left empty
    pub id: String,
    pub quality: String,
    pub parts: Vec<Part>,
    // Total size in bytes
    pub size: u64,
    // Container of the merged result
    pub ext: String,
    pub need_mux: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StreamBuilder {
    id: String,
    quality: String,
    parts: Vec<Part>,
    size: u64,
    ext: String,
    need_mux: bool,
}

impl Stream {
    pub fn builder() -> StreamBuilder {
        StreamBuilder::default()
    }

    /// Sum of the sizes of every part.
    pub fn parts_size(&self) -> u64 {
        self.parts.iter().map(|p| p.size).sum()
    }
}

impl StreamBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn parts(mut self, parts: Vec<Part>) -> Self {
        self.parts = parts;
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = ext.into();
        self
    }

    pub fn need_mux(mut self, need_mux: bool) -> Self {
        self.need_mux = need_mux;
        self
    }

    pub fn build(self) -> Stream {
        Stream {
            id: self.id,
            quality: self.quality,
            parts: self.parts,
            size: self.size,
            ext: self.ext,
            need_mux: self.need_mux,
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} parts, {} bytes, {})",
            self.id,
            self.quality,
            self.parts.len(),
            self.size,
            self.ext
        )?;
        if self.need_mux {
            write!(f, " [mux]")?;
        }
        Ok(())
    }
}

//! Types describing probed media streams.

use serde::{Deserialize, Serialize};

/// Kind of elementary stream inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    Other,
}

impl StreamKind {
    /// Maps an ffprobe `codec_type` string.
    pub fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "video" => Self::Video,
            "audio" => Self::Audio,
            "subtitle" => Self::Subtitle,
            "data" => Self::Data,
            "attachment" => Self::Attachment,
            _ => Self::Other,
        }
    }
}

/// One stream as reported by the probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Absolute stream index inside the container.
    pub index: u32,
    /// Stream kind.
    pub kind: StreamKind,
    /// Language tag (e.g. "eng"), if the container carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl StreamInfo {
    pub fn new(index: u32, kind: StreamKind, language: Option<&str>) -> Self {
        Self {
            index,
            kind,
            language: language.map(str::to_string),
        }
    }

    /// Whether this stream is tagged with `language`.
    pub fn has_language(&self, language: &str) -> bool {
        self.language.as_deref() == Some(language)
    }
}

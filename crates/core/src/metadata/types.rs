//! Types for episode metadata and index lookups.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

/// Everything the pipeline knows about one processed episode.
///
/// Serialized as the completion marker, so field names are part of the
/// on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    pub season: u32,
    pub episode: u32,
    /// Thumbnails in ascending start order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub thumbs: Vec<ThumbRef>,
    /// Cues in file order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subtitles: Vec<SubtitleCue>,
    /// Object key of the proxy video.
    pub video_file_key: String,
    /// Object key of the demuxed cue file.
    pub subs_file_key: String,
}

/// Older markers store an empty list as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One thumbnail covering `[start_ms, end_ms)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbRef {
    #[serde(rename = "key")]
    pub storage_key: String,
    #[serde(rename = "start")]
    pub start_ms: u64,
    #[serde(rename = "end")]
    pub end_ms: u64,
}

/// A cue quantized to the frame grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCue {
    #[serde(rename = "start")]
    pub start_ms: u64,
    #[serde(rename = "end")]
    pub end_ms: u64,
    pub text: String,
}

/// A full-text search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub season: u32,
    pub episode: u32,
    #[serde(rename = "start")]
    pub start_ms: u64,
    #[serde(rename = "end")]
    pub end_ms: u64,
    pub text: String,
}

/// Errors from the metadata index.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    /// An earlier insert failed; the scratch index must not be published.
    #[error("Index build aborted after a failed insert")]
    Poisoned,
}

impl MetadataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Persistence,
        }
    }
}

impl From<rusqlite::Error> for MetadataError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

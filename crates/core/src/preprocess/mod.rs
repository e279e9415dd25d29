//! Batch preprocessing of episode files.
//!
//! For every `S<season>E<episode>` file under the input directory the
//! [`Preprocessor`] runs one transcode job producing the proxy video, the
//! thumbnail strip and the demuxed cue file, then records the result in a
//! versioned completion marker and in a freshly built metadata index.
//!
//! # Example
//!
//! ```ignore
//! use clyper_core::preprocess::{PreprocessConfig, Preprocessor};
//! use clyper_core::toolchain::FfmpegToolchain;
//!
//! let preprocessor = Preprocessor::new(PreprocessConfig::default(), FfmpegToolchain::with_defaults());
//! let summary = preprocessor.process(Path::new("/media/show"), Path::new("/srv/clyper")).await?;
//! println!("{} transcoded, {} reused", summary.processed, summary.reused);
//! ```

mod config;
mod episode;
mod pipeline;

pub use config::PreprocessConfig;
pub use episode::parse_episode;
pub use pipeline::{ProcessSummary, Preprocessor};

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::metadata::MetadataError;
use crate::objstore::ObjectStoreError;
use crate::subtitle::SubtitleError;
use crate::toolchain::ToolchainError;

/// Errors that abort a preprocessing run.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Invalid preprocessing configuration: {0}")]
    InvalidConfig(String),

    #[error("No subtitle stream tagged '{language}' in {path}")]
    MissingSubtitleStream { path: PathBuf, language: String },

    #[error("No video stream in {path}")]
    MissingVideoStream { path: PathBuf },

    /// The probe or the transcode job failed.
    #[error("Transcode failed for {path}: {source}")]
    Toolchain {
        path: PathBuf,
        #[source]
        source: ToolchainError,
    },

    #[error("Unreadable completion marker {key}: {source}")]
    Marker {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Subtitle(#[from] SubtitleError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),

    #[error("Failed to walk input directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PreprocessError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn toolchain(path: impl Into<PathBuf>, source: ToolchainError) -> Self {
        Self::Toolchain {
            path: path.into(),
            source,
        }
    }

    /// Toolchain diagnostics, when the failure came from a subprocess.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Toolchain { source, .. } => source.diagnostics(),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_)
            | Self::MissingSubtitleStream { .. }
            | Self::MissingVideoStream { .. } => ErrorKind::Validation,
            Self::Toolchain { source, .. } => source.kind(),
            Self::Subtitle(e) => e.kind(),
            Self::Metadata(e) => e.kind(),
            Self::ObjectStore(e) => e.kind(),
            Self::Marker { .. } | Self::Walk(_) | Self::Io { .. } => ErrorKind::Persistence,
        }
    }
}

//! Caption-burned GIF clips from the proxy video.
//!
//! One transcode job trims the source, burns in the caption and encodes two
//! renditions (native rate and a reduced rate), each with its own palette.
//! The native rendition is kept when it fits the byte budget, otherwise the
//! reduced one is.

mod config;
mod rendition;
mod renderer;

pub use config::{ClipConfig, GifOptions};
pub use rendition::{select_rendition, validate_range, Rendition};
pub use renderer::ClipRenderer;

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::metadata::MetadataError;
use crate::objstore::ObjectStoreError;
use crate::toolchain::ToolchainError;

/// Longest clip that will be rendered.
pub const MAX_CLIP_DURATION_MS: u64 = 10_000;

/// Default byte budget for the native rendition.
pub const DEFAULT_MAX_BYTES: u64 = 2 * 1024 * 1024;

/// Frame rate of the fallback rendition.
pub const REDUCED_FPS: u32 = 12;

/// Errors from clip rendering.
#[derive(Debug, Error)]
pub enum ClipError {
    #[error("Invalid clip range {start_ms}..{end_ms}: {reason}")]
    InvalidRange {
        start_ms: u64,
        end_ms: u64,
        reason: String,
    },

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClipError {
    pub fn invalid_range(start_ms: u64, end_ms: u64, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            start_ms,
            end_ms,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRange { .. } => ErrorKind::Validation,
            Self::Toolchain(e) => e.kind(),
            Self::Metadata(e) => e.kind(),
            Self::ObjectStore(e) => e.kind(),
            Self::Io { .. } => ErrorKind::Persistence,
        }
    }
}

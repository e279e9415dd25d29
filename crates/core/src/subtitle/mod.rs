//! Subtitle cue parsing and frame-grid alignment.

mod align;
mod srt;

pub use align::align_cues;
pub use srt::{format_timestamp, parse_srt, single_cue_srt, RawCue};

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors from subtitle parsing.
#[derive(Debug, Error)]
pub enum SubtitleError {
    /// The cue file is malformed.
    #[error("Malformed subtitle file at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// The cue file is not valid UTF-8.
    #[error("Subtitle file is not valid UTF-8")]
    Encoding,
}

impl SubtitleError {
    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

//! Error types for the toolchain module.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur while probing or running a transcode graph.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The graph ran but the subprocess reported failure.
    #[error("Transcode failed: {reason}")]
    GraphFailed {
        reason: String,
        diagnostics: Option<String>,
    },

    /// The graph is structurally invalid and was never run.
    #[error("Invalid filter graph: {reason}")]
    InvalidGraph { reason: String },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Failed to parse FFprobe output.
    #[error("Failed to parse probe output: {reason}")]
    ParseError { reason: String },

    /// I/O error while talking to the subprocess.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolchainError {
    /// Creates a graph failure carrying the subprocess diagnostics.
    pub fn graph_failed(reason: impl Into<String>, diagnostics: Option<String>) -> Self {
        Self::GraphFailed {
            reason: reason.into(),
            diagnostics,
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Creates an invalid graph error.
    pub fn invalid_graph(reason: impl Into<String>) -> Self {
        Self::InvalidGraph {
            reason: reason.into(),
        }
    }

    /// Diagnostic text captured from the subprocess, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::GraphFailed { diagnostics, .. } => diagnostics.as_deref(),
            _ => None,
        }
    }

    /// Coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputNotFound { .. } => ErrorKind::Validation,
            Self::Io(_) => ErrorKind::Persistence,
            _ => ErrorKind::Toolchain,
        }
    }
}

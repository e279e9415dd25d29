//! Crate-wide error classification.
//!
//! Every module keeps its own error enum; `ErrorKind` is the coarse taxonomy
//! the serving layer maps to user-facing responses.

use serde::Serialize;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller's fault: bad range, missing required stream, malformed input.
    Validation,
    /// The external transcode toolchain failed.
    Toolchain,
    /// An index lookup missed.
    NotFound,
    /// Filesystem or index I/O failed.
    Persistence,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Toolchain => "toolchain",
            Self::NotFound => "not_found",
            Self::Persistence => "persistence",
        };
        f.write_str(s)
    }
}

//! Object store: string keys mapped to files under a filesystem root.
//!
//! Reads go through [`ObjectStore::open`]; writers (the preprocessing
//! pipeline, the transcode toolchain) resolve keys to paths and write
//! directly against the root.

mod keys;
mod local;

pub use keys::{normalize_dimension, EpisodeKeys, INDEX_KEY, MARKER_VERSION};
pub use local::LocalObjectStore;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs::File;

use crate::error::ErrorKind;

/// Errors from the object store.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl ObjectStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidKey(_) => ErrorKind::Validation,
            Self::Io { .. } => ErrorKind::Persistence,
        }
    }
}

/// Key-addressed storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Filesystem path backing `key`.
    fn resolve(&self, key: &str) -> Result<PathBuf, ObjectStoreError>;

    /// Opens `key` for reading.
    async fn open(&self, key: &str) -> Result<File, ObjectStoreError>;

    /// Whether `key` exists.
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;

    /// Writes `bytes` to `key`, creating parent directories.
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), ObjectStoreError>;
}

//! Filesystem-rooted object store.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};

use super::{ObjectStore, ObjectStoreError};

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn io_error(key: &str, source: std::io::Error) -> ObjectStoreError {
        if source.kind() == std::io::ErrorKind::NotFound {
            ObjectStoreError::NotFound(key.to_string())
        } else {
            ObjectStoreError::Io {
                key: key.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn resolve(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        if key.is_empty() {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    async fn open(&self, key: &str) -> Result<File, ObjectStoreError> {
        let path = self.resolve(key)?;
        File::open(&path).await.map_err(|e| Self::io_error(key, e))
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        let path = self.resolve(key)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| Self::io_error(key, e))
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), ObjectStoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(key, e))?;
        }
        fs::write(&path, bytes)
            .await
            .map_err(|e| Self::io_error(key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_write_then_open() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.write("public/01/02/thumb_00000000.jpg", b"jpeg").await.unwrap();
        assert!(store.exists("public/01/02/thumb_00000000.jpg").await.unwrap());

        let mut file = store.open("public/01/02/thumb_00000000.jpg").await.unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"jpeg");
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        let err = store.open("internal/metadata.db").await.unwrap_err();
        assert!(matches!(err, ObjectStoreError::NotFound(_)));
        assert!(!store.exists("internal/metadata.db").await.unwrap());
    }

    #[test]
    fn test_resolve_rejects_escaping_keys() {
        let store = LocalObjectStore::new("/srv/objects");
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
        assert_eq!(
            store.resolve("internal/01/01/subtitles.srt").unwrap(),
            PathBuf::from("/srv/objects/internal/01/01/subtitles.srt")
        );
    }
}

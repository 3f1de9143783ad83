//! File-storage capability for upload fields. The engine only sees opaque
//! reference paths; where the bytes land is the backend's concern.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileStoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist uploaded bytes and return the reference path stored on the
    /// record and served back under the upload prefix.
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, FileStoreError>;

    /// Resolve a served upload name to a local path, if this backend has one.
    fn local_path(&self, file_name: &str) -> Option<PathBuf>;
}

/// Disk-backed store writing timestamped names under the configured upload
/// directory.
pub struct DiskFileStore {
    dir: PathBuf,
}

impl DiskFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DiskFileStore { dir: dir.into() }
    }
}

#[async_trait]
impl FileStore for DiskFileStore {
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, FileStoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let ext = Path::new(suggested_name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let name = format!("{}{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0), ext);
        tokio::fs::write(self.dir.join(&name), bytes).await?;
        Ok(format!("/admin/uploads/{}", name))
    }

    fn local_path(&self, file_name: &str) -> Option<PathBuf> {
        // Reject traversal; served names are flat.
        if file_name.contains('/') || file_name.contains("..") {
            return None;
        }
        Some(self.dir.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_writes_and_returns_reference_path() {
        let dir = tempfile::tempdir().unwrap();
        let files = DiskFileStore::new(dir.path());
        let reference = files.store(b"hello", "photo.png").await.unwrap();
        assert!(reference.starts_with("/admin/uploads/"));
        assert!(reference.ends_with(".png"));
        let name = reference.rsplit('/').next().unwrap();
        let on_disk = tokio::fs::read(files.local_path(name).unwrap()).await.unwrap();
        assert_eq!(on_disk, b"hello");
    }

    #[test]
    fn local_path_rejects_traversal() {
        let files = DiskFileStore::new("uploads");
        assert!(files.local_path("../etc/passwd").is_none());
        assert!(files.local_path("a/b.png").is_none());
    }
}

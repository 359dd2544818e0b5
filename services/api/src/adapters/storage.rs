//! services/api/src/adapters/storage.rs
//!
//! Local-disk implementation of the `FileStorageService` port. Uploads are written
//! to `<root>/<owner_id>/<uuid>.<ext>`.

use async_trait::async_trait;
use lets_prep_core::domain::FileFormat;
use lets_prep_core::ports::{FileStorageService, PortError, PortResult};
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStorageService for LocalFileStore {
    async fn store(&self, owner_id: Uuid, format: FileFormat, bytes: &[u8]) -> PortResult<PathBuf> {
        let dir = self.root.join(owner_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to create upload dir: {}", e)))?;

        let path = dir.join(format!("{}.{}", Uuid::new_v4(), format.as_str()));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to write upload: {}", e)))?;

        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_uploads_under_the_owner_directory() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(root.path());
        let owner = Uuid::new_v4();

        let path = store.store(owner, FileFormat::Txt, b"hello").await.unwrap();

        assert!(path.starts_with(root.path().join(owner.to_string())));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("txt"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");
    }
}

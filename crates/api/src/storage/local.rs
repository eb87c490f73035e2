//! Filesystem-backed blob store rooted at `STORAGE_ROOT`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use axum::body::Bytes;

use super::{new_reference, BlobStore, StorageError};

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a reference to a path, refusing anything that escapes the root.
    fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(reference);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || reference.is_empty() {
            return Err(StorageError::InvalidReference(reference.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, file_name: &str, data: Bytes) -> Result<String, StorageError> {
        let reference = new_reference(file_name);
        let path = self.resolve(&reference)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        tracing::debug!(reference = %reference, bytes = data.len(), "Stored upload");
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("lessoncast-blobs-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn put_then_delete_round_trip_on_disk() {
        let root = temp_root();
        let store = LocalBlobStore::new(&root);

        let reference = store
            .put("f1.pdf", Bytes::from_static(b"%PDF-1.7"))
            .await
            .unwrap();
        let path = root.join(&reference);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.7");

        store.delete(&reference).await.unwrap();
        assert!(!path.exists());
        // Second delete is a no-op.
        store.delete(&reference).await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn escaping_references_are_rejected() {
        let store = LocalBlobStore::new(temp_root());
        assert_matches!(
            store.delete("../outside").await,
            Err(StorageError::InvalidReference(_))
        );
        assert_matches!(
            store.delete("/etc/passwd").await,
            Err(StorageError::InvalidReference(_))
        );
    }
}

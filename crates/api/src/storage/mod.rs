//! Blob storage collaborator for uploaded source files.
//!
//! Jobs only hold opaque references returned by [`BlobStore::put`].

use async_trait::async_trait;
use axum::body::Bytes;

pub mod local;
pub mod memory;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob reference: {0}")]
    InvalidReference(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` and return its reference. `file_name` is a hint only.
    async fn put(&self, file_name: &str, data: Bytes) -> Result<String, StorageError>;

    /// Remove a blob. Deleting a missing blob is not an error.
    async fn delete(&self, reference: &str) -> Result<(), StorageError>;
}

/// Reduce an uploaded file name to a safe single path segment.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Reference under which a new upload is stored: `sources/<uuid>-<name>`.
pub fn new_reference(file_name: &str) -> String {
    format!(
        "sources/{}-{}",
        uuid::Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}

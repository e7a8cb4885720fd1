//! Object storage for uploaded resume bytes.
//!
//! Two backends sit behind one `ObjectStore` seam: the local filesystem and an
//! S3-compatible bucket. Every resume record carries a `StoredRef` saying which
//! backend holds its bytes, so callers never branch on where a file lives.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod local;
pub mod s3;

pub use local::LocalDiskStore;
pub use s3::S3BlobStore;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob store error: {0}")]
    Backend(String),
}

/// Minimal byte store keyed by a relative, `/`-separated path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `bytes` under `key`. Returns only once the bytes are durable.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str)
        -> Result<(), ObjectStoreError>;

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;

    /// Removes `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}

/// Which backend holds (or will hold) a resume's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Filesystem,
    Blob,
}

impl StorageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKind::Filesystem => "filesystem",
            StorageKind::Blob => "blob",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "filesystem" => Some(StorageKind::Filesystem),
            "blob" => Some(StorageKind::Blob),
            _ => None,
        }
    }
}

/// Location of a resume's bytes, resolved once at the store boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum StoredRef {
    Filesystem(String),
    Blob(String),
}

impl StoredRef {
    pub fn new(kind: StorageKind, key: String) -> Self {
        match kind {
            StorageKind::Filesystem => StoredRef::Filesystem(key),
            StorageKind::Blob => StoredRef::Blob(key),
        }
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            StoredRef::Filesystem(_) => StorageKind::Filesystem,
            StoredRef::Blob(_) => StorageKind::Blob,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            StoredRef::Filesystem(key) | StoredRef::Blob(key) => key,
        }
    }
}

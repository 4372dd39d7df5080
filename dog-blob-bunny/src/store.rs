use async_trait::async_trait;
use bytes::Bytes;

use crate::BlobResult;

/// Backend client capability set consumed by the storage adapter.
///
/// Implementations perform the actual I/O and report failures with full detail;
/// the adapter decides what callers get to see.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a whole object in one request
    async fn put(&self, name: &str, body: Bytes, options: &PutOptions) -> BlobResult<()>;

    /// Fetch the full object content
    async fn get(&self, name: &str) -> BlobResult<Bytes>;

    /// Delete one object by name
    async fn delete(&self, name: &str) -> BlobResult<()>;

    /// Delete every object whose name starts with `prefix`
    async fn delete_path(&self, prefix: &str) -> BlobResult<()>;

    /// Check whether an object exists
    async fn exists(&self, name: &str) -> BlobResult<bool>;
}

/// Request metadata for a single-part put
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub checksum: Option<String>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

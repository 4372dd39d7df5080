use async_trait::async_trait;
use bytes::Bytes;

use crate::{stream_from_bytes, BlobResult, ByteRange, ByteStream, UploadOptions, UrlOptions};

/// Backend-agnostic storage service.
///
/// Every implementation exposes the same contract:
/// - `upload` fails only with [`BlobError::Integrity`](crate::BlobError::Integrity)
/// - `download` fails only with [`BlobError::FileNotFound`](crate::BlobError::FileNotFound)
/// - `delete` and `delete_prefixed` never fail
/// - `exists` propagates backend errors instead of answering `false`
/// - URL generation is pure and never touches the network
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Configured service name, if any
    fn name(&self) -> Option<&str>;

    /// Whether `url()` returns public URLs
    fn is_public(&self) -> bool;

    /// Store a payload under `key` in a single request
    async fn upload(&self, key: &str, body: ByteStream, options: UploadOptions) -> BlobResult<()>;

    /// Store an in-memory buffer under `key`
    async fn upload_bytes(&self, key: &str, data: Bytes, options: UploadOptions) -> BlobResult<()> {
        self.upload(key, stream_from_bytes(data), options).await
    }

    /// Fetch the whole object as raw bytes
    async fn download(&self, key: &str) -> BlobResult<Bytes>;

    /// Ranged reads; not every service supports them
    async fn download_chunk(&self, key: &str, range: ByteRange) -> BlobResult<Bytes>;

    /// Best-effort delete of a single object
    async fn delete(&self, key: &str);

    /// Best-effort delete of every object under `prefix`
    async fn delete_prefixed(&self, prefix: &str);

    /// Whether an object is stored under `key`
    async fn exists(&self, key: &str) -> BlobResult<bool>;

    /// URL for `key`, public or private depending on the service configuration
    fn url(&self, key: &str, options: &UrlOptions) -> String;

    /// Permanent, unsigned URL
    fn public_url(&self, key: &str) -> String;

    /// Time-limited URL
    fn private_url(&self, key: &str, options: &UrlOptions) -> String;
}

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::join_all;
use tracing::{info, warn};

use crate::{
    collect_stream, BlobError, BlobResult, ByteRange, ByteStream, ServiceOptions, StorageService,
    UploadOptions, UrlOptions,
};

/// Writes to a primary service and every mirror; reads only from the primary.
///
/// Useful while migrating between zones: uploads land everywhere, deletes are
/// attempted everywhere, and URLs keep pointing at the primary.
pub struct MirrorService {
    primary: Arc<dyn StorageService>,
    mirrors: Vec<Arc<dyn StorageService>>,
    options: ServiceOptions,
}

impl MirrorService {
    pub fn new(
        primary: Arc<dyn StorageService>,
        mirrors: Vec<Arc<dyn StorageService>>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            primary,
            mirrors,
            options,
        }
    }

    pub fn primary(&self) -> &Arc<dyn StorageService> {
        &self.primary
    }

    pub fn mirrors(&self) -> &[Arc<dyn StorageService>] {
        &self.mirrors
    }

    /// Copy an object that already exists on the primary to every mirror
    pub async fn mirror(&self, key: &str, checksum: Option<String>) -> BlobResult<()> {
        let data = self.primary.download(key).await?;
        let mut options = UploadOptions::new();
        options.checksum = checksum;

        info!("Mirroring {} to {} services", key, self.mirrors.len());
        self.upload_to_mirrors(key, data, options).await
    }

    async fn upload_to_mirrors(
        &self,
        key: &str,
        data: Bytes,
        options: UploadOptions,
    ) -> BlobResult<()> {
        let uploads = self
            .mirrors
            .iter()
            .map(|mirror| mirror.upload_bytes(key, data.clone(), options.clone()));

        join_all(uploads).await.into_iter().collect()
    }
}

#[async_trait]
impl StorageService for MirrorService {
    fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }

    fn is_public(&self) -> bool {
        self.primary.is_public()
    }

    async fn upload(&self, key: &str, body: ByteStream, options: UploadOptions) -> BlobResult<()> {
        let data = collect_stream(body).await.map_err(|err| {
            warn!("Reading upload body for {} failed: {}", key, err);
            BlobError::integrity(key)
        })?;

        self.primary.upload_bytes(key, data.clone(), options.clone()).await?;
        self.upload_to_mirrors(key, data, options).await
    }

    async fn download(&self, key: &str) -> BlobResult<Bytes> {
        self.primary.download(key).await
    }

    async fn download_chunk(&self, key: &str, range: ByteRange) -> BlobResult<Bytes> {
        self.primary.download_chunk(key, range).await
    }

    async fn delete(&self, key: &str) {
        let services = std::iter::once(&self.primary).chain(self.mirrors.iter());
        join_all(services.map(|service| service.delete(key))).await;
    }

    async fn delete_prefixed(&self, prefix: &str) {
        let services = std::iter::once(&self.primary).chain(self.mirrors.iter());
        join_all(services.map(|service| service.delete_prefixed(prefix))).await;
    }

    async fn exists(&self, key: &str) -> BlobResult<bool> {
        self.primary.exists(key).await
    }

    fn url(&self, key: &str, options: &UrlOptions) -> String {
        self.primary.url(key, options)
    }

    fn public_url(&self, key: &str) -> String {
        self.primary.public_url(key)
    }

    fn private_url(&self, key: &str, options: &UrlOptions) -> String {
        self.primary.private_url(key, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BunnyService, MemoryBlobStore};

    fn memory_service(zone: &str) -> (Arc<MemoryBlobStore>, Arc<dyn StorageService>) {
        let store = Arc::new(MemoryBlobStore::new());
        let service =
            BunnyService::with_shared_store(store.clone(), zone, ServiceOptions::default());
        (store, Arc::new(service))
    }

    #[tokio::test]
    async fn test_upload_reaches_every_service() {
        let (primary_store, primary) = memory_service("primary");
        let (mirror_store, mirror) = memory_service("mirror");
        let service = MirrorService::new(primary, vec![mirror], ServiceOptions::default());

        service
            .upload_bytes("a/b.png", Bytes::from_static(b"img"), UploadOptions::new())
            .await
            .unwrap();

        assert!(primary_store.object("a/b.png").await.is_some());
        assert!(mirror_store.object("a/b.png").await.is_some());
        assert_eq!(service.public_url("a/b.png"), "https://primary.b-cdn.net/a/b.png");
    }

    #[tokio::test]
    async fn test_delete_prefixed_reaches_every_service() {
        let (primary_store, primary) = memory_service("primary");
        let (mirror_store, mirror) = memory_service("mirror");
        let service = MirrorService::new(primary, vec![mirror], ServiceOptions::default());

        for key in ["a/1", "b/2"] {
            service
                .upload_bytes(key, Bytes::from_static(b"x"), UploadOptions::new())
                .await
                .unwrap();
        }
        service.delete_prefixed("a/").await;

        assert!(primary_store.object("a/1").await.is_none());
        assert!(mirror_store.object("a/1").await.is_none());
        assert!(mirror_store.object("b/2").await.is_some());
    }

    #[tokio::test]
    async fn test_mirror_copies_existing_object() {
        let (primary_store, primary) = memory_service("primary");
        let (mirror_store, mirror) = memory_service("mirror");
        primary
            .upload_bytes("a", Bytes::from_static(b"abc"), UploadOptions::new())
            .await
            .unwrap();

        let service = MirrorService::new(primary, vec![mirror], ServiceOptions::default());
        service.mirror("a", None).await.unwrap();

        assert!(primary_store.object("a").await.is_some());
        assert_eq!(mirror_store.object("a").await.unwrap().body, Bytes::from_static(b"abc"));
    }
}

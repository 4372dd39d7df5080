use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, debug_span, warn, Instrument};

use crate::url::{derive_content_disposition, public_url};
use crate::{
    collect_stream, BlobError, BlobResult, BlobStore, BunnyConfig, BunnyEdgeStore, ByteRange,
    ByteStream, InstrumentEvent, InstrumentPayload, Instrumentation, Operation, PutOptions,
    ServiceOptions, StorageService, TracingInstrumentation, UploadOptions, UrlOptions,
};

const SERVICE_NAME: &str = "Bunny";

/// Storage service backed by a Bunny storage zone and served through a pull zone.
///
/// Holds no per-object state: everything lives in the backend, so one instance can be
/// shared across tasks for the lifetime of the application.
pub struct BunnyService {
    store: Arc<dyn BlobStore>,
    cdn_zone: String,
    options: ServiceOptions,
    instrumentation: Arc<dyn Instrumentation>,
}

impl BunnyService {
    /// Create a service talking to Bunny Edge Storage
    pub fn new(config: BunnyConfig) -> BlobResult<Self> {
        let store = BunnyEdgeStore::new(&config)?;
        Ok(Self::with_store(store, config.cdn_zone, config.options))
    }

    /// Create with a custom backend client
    pub fn with_store<S, Z>(store: S, cdn_zone: Z, options: ServiceOptions) -> Self
    where
        S: BlobStore + 'static,
        Z: Into<String>,
    {
        Self::with_shared_store(Arc::new(store), cdn_zone, options)
    }

    /// Create with a backend client that is shared with other owners
    pub fn with_shared_store<Z: Into<String>>(
        store: Arc<dyn BlobStore>,
        cdn_zone: Z,
        options: ServiceOptions,
    ) -> Self {
        Self {
            store,
            cdn_zone: cdn_zone.into(),
            options,
            instrumentation: Arc::new(TracingInstrumentation),
        }
    }

    /// Replace the default tracing instrumentation
    pub fn with_instrumentation<I>(mut self, instrumentation: I) -> Self
    where
        I: Instrumentation + 'static,
    {
        self.instrumentation = Arc::new(instrumentation);
        self
    }

    /// Pull zone used for URLs
    pub fn cdn_zone(&self) -> &str {
        &self.cdn_zone
    }

    fn payload(&self) -> InstrumentPayload {
        InstrumentPayload::new(SERVICE_NAME)
    }

    /// Run `operation` between the instrumentation start and finish hooks.
    ///
    /// `annotate` may add result data to the payload before it is reported.
    async fn instrumented<T, Fut, A>(
        &self,
        operation: Operation,
        mut payload: InstrumentPayload,
        fut: Fut,
        annotate: A,
    ) -> BlobResult<T>
    where
        Fut: Future<Output = BlobResult<T>>,
        A: FnOnce(&T, &mut InstrumentPayload),
    {
        self.instrumentation.start(operation, &payload);

        let span = debug_span!(
            "blob_service",
            operation = operation.as_str(),
            key = payload.key.as_deref().or(payload.prefix.as_deref())
        );
        let started = Instant::now();
        let result = fut.instrument(span).await;

        match &result {
            Ok(value) => annotate(value, &mut payload),
            Err(err) => payload.error = Some(err.to_string()),
        }
        self.finish(operation, payload, started.elapsed(), result.is_ok());

        result
    }

    fn finish(
        &self,
        operation: Operation,
        payload: InstrumentPayload,
        duration: Duration,
        succeeded: bool,
    ) {
        let event = InstrumentEvent {
            name: operation.event_name(),
            operation,
            payload,
            duration,
            succeeded,
        };
        self.instrumentation.finish(&event);
    }
}

fn ignore<T>(_: &T, _: &mut InstrumentPayload) {}

#[async_trait]
impl StorageService for BunnyService {
    fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }

    fn is_public(&self) -> bool {
        self.options.public
    }

    async fn upload(&self, key: &str, body: ByteStream, options: UploadOptions) -> BlobResult<()> {
        let payload = self.payload().with_key(key).with_checksum(options.checksum.clone());
        let put = PutOptions {
            content_disposition: derive_content_disposition(&options),
            checksum: options.checksum,
            content_type: options.content_type,
        };

        let store = &self.store;
        let transfer = async move {
            let data = collect_stream(body).await?;
            store.put(key, data, &put).await
        };

        self.instrumented(Operation::Upload, payload, transfer, ignore)
            .await
            .map_err(|err| {
                warn!("Upload of {} failed: {}", key, err);
                BlobError::integrity(key)
            })
    }

    async fn download(&self, key: &str) -> BlobResult<Bytes> {
        let payload = self.payload().with_key(key);

        self.instrumented(Operation::Download, payload, self.store.get(key), ignore)
            .await
            .map_err(|err| {
                warn!("Download of {} failed: {}", key, err);
                BlobError::file_not_found(key)
            })
    }

    async fn download_chunk(&self, key: &str, range: ByteRange) -> BlobResult<Bytes> {
        let payload = self.payload().with_key(key);
        debug!("Ranged read {:?} requested for {}", range, key);

        self.instrumented(
            Operation::DownloadChunk,
            payload,
            async { Err::<Bytes, _>(BlobError::Unsupported) },
            ignore,
        )
        .await
    }

    async fn delete(&self, key: &str) {
        let payload = self.payload().with_key(key);
        let request = async {
            match self.store.delete(key).await {
                Err(err) if err.is_not_found() => Ok(()),
                other => other,
            }
        };

        if let Err(err) = self.instrumented(Operation::Delete, payload, request, ignore).await {
            warn!("Ignoring failed delete of {}: {}", key, err);
        }
    }

    async fn delete_prefixed(&self, prefix: &str) {
        let payload = self.payload().with_prefix(prefix);
        let request = async {
            match self.store.delete_path(prefix).await {
                Err(err) if err.is_not_found() => Ok(()),
                other => other,
            }
        };

        let result = self
            .instrumented(Operation::DeletePrefixed, payload, request, ignore)
            .await;
        if let Err(err) = result {
            warn!("Ignoring failed delete of prefix {}: {}", prefix, err);
        }
    }

    async fn exists(&self, key: &str) -> BlobResult<bool> {
        let payload = self.payload().with_key(key);

        let annotate = |exist: &bool, payload: &mut InstrumentPayload| payload.exist = Some(*exist);
        self.instrumented(Operation::Exist, payload, self.store.exists(key), annotate)
            .await
    }

    fn url(&self, key: &str, options: &UrlOptions) -> String {
        let mut payload = self.payload().with_key(key);
        self.instrumentation.start(Operation::Url, &payload);
        let started = Instant::now();

        let url = if self.options.public {
            self.public_url(key)
        } else {
            self.private_url(key, options)
        };

        payload.url = Some(url.clone());
        self.finish(Operation::Url, payload, started.elapsed(), true);
        url
    }

    fn public_url(&self, key: &str) -> String {
        public_url(&self.cdn_zone, key)
    }

    /// Bunny pull zones have no signed, expiring URLs; private URLs are the public ones.
    fn private_url(&self, key: &str, _options: &UrlOptions) -> String {
        self.public_url(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventRecorder, MemoryBlobStore};
    use tracing_test::traced_test;

    struct UnreachableStore;

    #[async_trait]
    impl BlobStore for UnreachableStore {
        async fn put(&self, _name: &str, _body: Bytes, _options: &PutOptions) -> BlobResult<()> {
            Err(BlobError::status(502, "Bad Gateway"))
        }

        async fn get(&self, _name: &str) -> BlobResult<Bytes> {
            Err(BlobError::status(502, "Bad Gateway"))
        }

        async fn delete(&self, _name: &str) -> BlobResult<()> {
            Err(BlobError::status(502, "Bad Gateway"))
        }

        async fn delete_path(&self, _prefix: &str) -> BlobResult<()> {
            Err(BlobError::status(502, "Bad Gateway"))
        }

        async fn exists(&self, _name: &str) -> BlobResult<bool> {
            Err(BlobError::status(502, "Bad Gateway"))
        }
    }

    fn service() -> (BunnyService, EventRecorder) {
        let recorder = EventRecorder::new();
        let service =
            BunnyService::with_store(MemoryBlobStore::new(), "assets", ServiceOptions::default())
                .with_instrumentation(recorder.clone());
        (service, recorder)
    }

    #[tokio::test]
    async fn test_upload_payload_carries_checksum() {
        let (service, recorder) = service();
        let options = UploadOptions::new().with_checksum("c2hhMjU2");

        service
            .upload_bytes("a/b.png", Bytes::from_static(b"png"), options)
            .await
            .unwrap();

        let event = recorder.last(Operation::Upload).unwrap();
        assert_eq!(event.name, "service_upload.dog_blob");
        assert_eq!(event.payload.service, "Bunny");
        assert_eq!(event.payload.key.as_deref(), Some("a/b.png"));
        assert_eq!(event.payload.checksum.as_deref(), Some("c2hhMjU2"));
        assert!(event.succeeded);
    }

    #[tokio::test]
    async fn test_exists_is_annotated() {
        let (service, recorder) = service();
        assert!(!service.exists("missing").await.unwrap());

        let event = recorder.last(Operation::Exist).unwrap();
        assert_eq!(event.payload.exist, Some(false));
    }

    #[tokio::test]
    async fn test_download_chunk_is_unsupported() {
        let (service, recorder) = service();
        service
            .upload_bytes("a", Bytes::from_static(b"abc"), UploadOptions::new())
            .await
            .unwrap();

        let err = service
            .download_chunk("a", ByteRange::new(0, Some(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Unsupported));
        assert!(!recorder.last(Operation::DownloadChunk).unwrap().succeeded);
    }

    #[test]
    fn test_url_dispatch_and_private_fallback() {
        let (service, recorder) = service();
        let options = UrlOptions::new()
            .with_expires_in(Duration::from_secs(60))
            .with_filename("b.png");

        let url = service.url("a/b.png", &options);
        assert_eq!(url, "https://assets.b-cdn.net/a/b.png");
        assert_eq!(url, service.private_url("a/b.png", &options));

        let event = recorder.last(Operation::Url).unwrap();
        assert_eq!(event.payload.url.as_deref(), Some("https://assets.b-cdn.net/a/b.png"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_swallowed_failures_are_logged() {
        let service =
            BunnyService::with_store(UnreachableStore, "assets", ServiceOptions::default());

        service.delete("a/b.png").await;
        service.delete_prefixed("a/").await;

        assert!(logs_contain("Ignoring failed delete of a/b.png"));
        assert!(logs_contain("Ignoring failed delete of prefix a/"));
        assert!(logs_contain("Bad Gateway"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_normalized_failures_keep_cause_in_logs() {
        let service =
            BunnyService::with_store(UnreachableStore, "assets", ServiceOptions::default());

        let upload = service
            .upload_bytes("a", Bytes::from_static(b"x"), UploadOptions::new())
            .await;
        let download = service.download("a").await;

        assert!(matches!(upload, Err(BlobError::Integrity { .. })));
        assert!(matches!(download, Err(BlobError::FileNotFound { .. })));
        assert!(logs_contain("Upload of a failed"));
        assert!(logs_contain("Download of a failed"));
    }

    #[tokio::test]
    async fn test_delete_of_missing_object_is_not_a_failure() {
        let (service, recorder) = service();
        service.delete("never/there").await;
        assert!(recorder.last(Operation::Delete).unwrap().succeeded);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = BunnyService::new(BunnyConfig::new("assets", "", "assets-cdn"));
        assert!(matches!(result, Err(BlobError::Invalid { .. })));
    }
}

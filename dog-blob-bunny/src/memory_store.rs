use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::url::{normalize_key, object_key};
use crate::{BlobError, BlobResult, BlobStore, PutOptions};

/// Object held by [`MemoryBlobStore`]
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub options: PutOptions,
}

/// In-process blob store for tests and local development.
///
/// Keys are normalized like [`BunnyEdgeStore`](crate::BunnyEdgeStore) does, so `/a/b.png`
/// and `a/b.png` name the same object.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an object together with the metadata it was stored with
    pub async fn object(&self, name: &str) -> Option<StoredObject> {
        let name = object_key(name).ok()?;
        self.objects.read().await.get(name).cloned()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, name: &str, body: Bytes, options: &PutOptions) -> BlobResult<()> {
        let name = object_key(name)?;
        let object = StoredObject {
            body,
            options: options.clone(),
        };
        self.objects.write().await.insert(name.to_string(), object);
        Ok(())
    }

    async fn get(&self, name: &str) -> BlobResult<Bytes> {
        let name = object_key(name)?;
        self.objects
            .read()
            .await
            .get(name)
            .map(|object| object.body.clone())
            .ok_or_else(|| BlobError::not_found(name))
    }

    async fn delete(&self, name: &str) -> BlobResult<()> {
        let name = object_key(name)?;
        match self.objects.write().await.remove(name) {
            Some(_) => Ok(()),
            None => Err(BlobError::not_found(name)),
        }
    }

    async fn delete_path(&self, prefix: &str) -> BlobResult<()> {
        if normalize_key(prefix)?.is_empty() {
            return Err(BlobError::invalid("refusing to delete every object"));
        }

        let prefix = prefix.trim_start_matches('/');
        self.objects
            .write()
            .await
            .retain(|name, _| !name.starts_with(prefix));
        Ok(())
    }

    async fn exists(&self, name: &str) -> BlobResult<bool> {
        let name = object_key(name)?;
        Ok(self.objects.read().await.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryBlobStore::new();
        let options = PutOptions {
            content_type: Some("image/png".to_string()),
            ..Default::default()
        };

        store.put("a/b.png", Bytes::from_static(b"\x89PNG"), &options).await.unwrap();
        assert_eq!(store.get("a/b.png").await.unwrap(), Bytes::from_static(b"\x89PNG"));
        assert_eq!(store.object("a/b.png").await.unwrap().options, options);

        store.delete("a/b.png").await.unwrap();
        assert!(store.get("a/b.png").await.unwrap_err().is_not_found());
        assert!(store.delete("a/b.png").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_path_only_touches_prefix() {
        let store = MemoryBlobStore::new();
        for name in ["a/1", "a/2", "ab/3", "b/4"] {
            store.put(name, Bytes::from_static(b"x"), &PutOptions::default()).await.unwrap();
        }

        store.delete_path("a/").await.unwrap();

        assert!(!store.exists("a/1").await.unwrap());
        assert!(!store.exists("a/2").await.unwrap());
        assert!(store.exists("ab/3").await.unwrap());
        assert!(store.exists("b/4").await.unwrap());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_rejects_empty_name() {
        let store = MemoryBlobStore::new();
        let err = store.put("", Bytes::new(), &PutOptions::default()).await.unwrap_err();
        assert!(matches!(err, BlobError::Invalid { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_keys_are_normalized() {
        let store = MemoryBlobStore::new();
        store.put("/a/b.png", Bytes::from_static(b"x"), &PutOptions::default()).await.unwrap();

        assert!(store.exists("a/b.png").await.unwrap());
        assert!(store.exists("a/b.png/").await.unwrap());
        assert!(store.object("a/b.png").await.is_some());
        assert_eq!(store.len().await, 1);

        store.delete("a/b.png").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_rejects_dot_segments_and_root_prefix() {
        let store = MemoryBlobStore::new();
        store.put("a/1", Bytes::from_static(b"x"), &PutOptions::default()).await.unwrap();

        let err = store
            .put("a/../b", Bytes::new(), &PutOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Invalid { .. }));
        assert!(matches!(store.delete_path("").await, Err(BlobError::Invalid { .. })));
        assert!(matches!(store.delete_path("a/..").await, Err(BlobError::Invalid { .. })));
        assert_eq!(store.len().await, 1);
    }
}

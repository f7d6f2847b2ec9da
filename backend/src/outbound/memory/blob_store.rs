//! In-process blob store for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ports::{BlobStore, BlobStoreError, StoredBlob};
use crate::domain::{BlobKey, ImageData, ImageLocator};

/// Blob store keeping objects in memory.
///
/// Locators are `<public_base_url>/<key>`; pair it with the image serving
/// route so they resolve.
#[derive(Debug)]
pub struct InMemoryBlobStore {
    public_base_url: String,
    objects: RwLock<HashMap<BlobKey, StoredBlob>>,
}

impl InMemoryBlobStore {
    /// Build an empty store whose locators start with `public_base_url`.
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Whether an object is stored under `key`.
    pub async fn contains(&self, key: &BlobKey) -> bool {
        self.objects.read().await.contains_key(key)
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        key: &BlobKey,
        image: &ImageData,
        content_type: &str,
    ) -> Result<ImageLocator, BlobStoreError> {
        self.objects.write().await.insert(
            key.clone(),
            StoredBlob {
                bytes: image.as_bytes().to_vec(),
                content_type: content_type.to_owned(),
            },
        );
        Ok(self.locator(key))
    }

    async fn fetch(&self, key: &BlobKey) -> Result<StoredBlob, BlobStoreError> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| BlobStoreError::not_found(key.as_ref()))
    }

    async fn delete(&self, key: &BlobKey) -> Result<(), BlobStoreError> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BlobStoreError::not_found(key.as_ref()))
    }

    fn locator(&self, key: &BlobKey) -> ImageLocator {
        ImageLocator::join(&self.public_base_url, key)
    }
}

//! Port abstraction for the object store holding profile images.

use async_trait::async_trait;

use crate::domain::{BlobKey, ImageData, ImageLocator};

use super::define_port_error;

define_port_error! {
    /// Errors raised by blob store adapters.
    pub enum BlobStoreError {
        /// Writing or deleting the object failed.
        Write { message: String } => "blob store write failed: {message}",
        /// Reading the object failed for a reason other than absence.
        Read { message: String } => "blob store read failed: {message}",
        /// No object exists under the key.
        NotFound { key: String } => "blob {key} does not exist",
    }
}

/// Bytes and content type of a stored object.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Object contents.
    pub bytes: Vec<u8>,
    /// MIME type recorded when the object was written.
    pub content_type: String,
}

impl std::fmt::Debug for StoredBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredBlob")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Keyed binary object storage with deterministic public locators.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `image` under `key`, overwriting any previous object.
    ///
    /// Returns the public locator of the stored object.
    async fn put(
        &self,
        key: &BlobKey,
        image: &ImageData,
        content_type: &str,
    ) -> Result<ImageLocator, BlobStoreError>;

    /// Retrieve a stored object.
    async fn fetch(&self, key: &BlobKey) -> Result<StoredBlob, BlobStoreError>;

    /// Remove a stored object.
    ///
    /// Fails with [`BlobStoreError::NotFound`] when nothing is stored under
    /// the key.
    async fn delete(&self, key: &BlobKey) -> Result<(), BlobStoreError>;

    /// Locator an object stored under `key` is reachable at. Performs no I/O.
    fn locator(&self, key: &BlobKey) -> ImageLocator;
}

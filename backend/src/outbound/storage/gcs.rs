//! Reqwest-backed Google Cloud Storage blob store.
//!
//! Talks to the JSON API directly: media uploads for writes, `alt=media`
//! downloads for reads and object deletes. The adapter owns transport details
//! only (URL construction, bearer auth, timeout and status mapping).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;
use zeroize::Zeroizing;

use crate::domain::ports::{BlobStore, BlobStoreError, StoredBlob};
use crate::domain::{BlobKey, ImageData, ImageLocator};

/// Public Cloud Storage endpoint; locators are served from the same host.
pub const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors raised while building the adapter.
#[derive(Debug, thiserror::Error)]
pub enum GcsSetupError {
    /// The endpoint cannot carry path segments.
    #[error("invalid object storage endpoint `{endpoint}`")]
    Endpoint { endpoint: String },
    /// The HTTP client could not be constructed.
    #[error("failed to build object storage client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Connection settings for [`GcsBlobStore`].
pub struct GcsConfig {
    /// Bucket holding profile images.
    pub bucket: String,
    /// API endpoint; [`DEFAULT_GCS_ENDPOINT`] outside of emulators.
    pub endpoint: Url,
    /// OAuth bearer token; omitted for emulators accepting anonymous calls.
    pub access_token: Option<Zeroizing<String>>,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Cloud Storage adapter for the [`BlobStore`] port.
pub struct GcsBlobStore {
    client: Client,
    endpoint: Url,
    bucket: String,
    access_token: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for GcsBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsBlobStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("bucket", &self.bucket)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GcsBlobStore {
    /// Build an adapter using a reqwest client with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint cannot be a base URL or the client
    /// cannot be constructed.
    pub fn new(config: GcsConfig) -> Result<Self, GcsSetupError> {
        if config.endpoint.cannot_be_a_base() {
            return Err(GcsSetupError::Endpoint {
                endpoint: config.endpoint.to_string(),
            });
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint,
            bucket: config.bucket,
            access_token: config.access_token,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, BlobStoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| BlobStoreError::write("object storage endpoint cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn upload_url(&self, key: &BlobKey) -> Result<Url, BlobStoreError> {
        let mut url = self.url(&["upload", "storage", "v1", "b", &self.bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key.as_ref());
        Ok(url)
    }

    fn object_url(&self, key: &BlobKey) -> Result<Url, BlobStoreError> {
        self.url(&["storage", "v1", "b", &self.bucket, "o", key.as_ref()])
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token.as_str())),
            None => request,
        }
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn put(
        &self,
        key: &BlobKey,
        image: &ImageData,
        content_type: &str,
    ) -> Result<ImageLocator, BlobStoreError> {
        let request = self
            .client
            .post(self.upload_url(key)?)
            .header(CONTENT_TYPE, content_type)
            .body(image.as_bytes().to_vec());
        let response = self
            .authorised(request)
            .send()
            .await
            .map_err(|err| map_transport_error(err, |message| BlobStoreError::write(message)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(map_status_error(key, status, &body, |message| {
                BlobStoreError::write(message)
            }));
        }
        Ok(self.locator(key))
    }

    async fn fetch(&self, key: &BlobKey) -> Result<StoredBlob, BlobStoreError> {
        let mut url = self.object_url(key)?;
        url.query_pairs_mut().append_pair("alt", "media");
        let response = self
            .authorised(self.client.get(url))
            .send()
            .await
            .map_err(|err| map_transport_error(err, |message| BlobStoreError::read(message)))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_owned();
        let body = response
            .bytes()
            .await
            .map_err(|err| map_transport_error(err, |message| BlobStoreError::read(message)))?;
        if !status.is_success() {
            return Err(map_status_error(key, status, &body, |message| {
                BlobStoreError::read(message)
            }));
        }
        Ok(StoredBlob {
            bytes: body.to_vec(),
            content_type,
        })
    }

    async fn delete(&self, key: &BlobKey) -> Result<(), BlobStoreError> {
        let response = self
            .authorised(self.client.delete(self.object_url(key)?))
            .send()
            .await
            .map_err(|err| map_transport_error(err, |message| BlobStoreError::write(message)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(map_status_error(key, status, &body, |message| {
                BlobStoreError::write(message)
            }));
        }
        Ok(())
    }

    fn locator(&self, key: &BlobKey) -> ImageLocator {
        let base = format!(
            "{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            self.bucket
        );
        ImageLocator::join(&base, key)
    }
}

fn map_transport_error(
    error: reqwest::Error,
    kind: fn(String) -> BlobStoreError,
) -> BlobStoreError {
    if error.is_timeout() {
        kind(format!("object storage request timed out: {error}"))
    } else {
        kind(format!("object storage request failed: {error}"))
    }
}

fn map_status_error(
    key: &BlobKey,
    status: StatusCode,
    body: &[u8],
    kind: fn(String) -> BlobStoreError,
) -> BlobStoreError {
    if status == StatusCode::NOT_FOUND {
        return BlobStoreError::not_found(key.as_ref());
    }
    let preview = body_preview(body);
    if preview.is_empty() {
        kind(format!("status {}", status.as_u16()))
    } else {
        kind(format!("status {}: {preview}", status.as_u16()))
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network Cloud Storage helpers.

    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> GcsBlobStore {
        GcsBlobStore::new(GcsConfig {
            bucket: "users-images".to_owned(),
            endpoint: Url::parse(DEFAULT_GCS_ENDPOINT).expect("endpoint"),
            access_token: Some(Zeroizing::new("secret-token".to_owned())),
            timeout: Duration::from_secs(5),
        })
        .expect("store builds")
    }

    fn key() -> BlobKey {
        BlobKey::new("3fa85f64-5717-4562-b3fc-2c963f66afa6.jpg").expect("key")
    }

    #[rstest]
    fn locator_points_at_public_bucket_url(store: GcsBlobStore) {
        assert_eq!(
            store.locator(&key()).as_ref(),
            "https://storage.googleapis.com/users-images/3fa85f64-5717-4562-b3fc-2c963f66afa6.jpg"
        );
    }

    #[rstest]
    fn upload_url_uses_media_upload(store: GcsBlobStore) {
        let url = store.upload_url(&key()).expect("url");
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/upload/storage/v1/b/users-images/o?uploadType=media&name=3fa85f64-5717-4562-b3fc-2c963f66afa6.jpg"
        );
    }

    #[rstest]
    fn object_url_addresses_single_object(store: GcsBlobStore) {
        let url = store.object_url(&key()).expect("url");
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/users-images/o/3fa85f64-5717-4562-b3fc-2c963f66afa6.jpg"
        );
    }

    #[rstest]
    fn emulator_endpoint_with_path_keeps_prefix() {
        let store = GcsBlobStore::new(GcsConfig {
            bucket: "b".to_owned(),
            endpoint: Url::parse("http://localhost:4443/gcs/").expect("endpoint"),
            access_token: None,
            timeout: Duration::from_secs(5),
        })
        .expect("store builds");

        let url = store.object_url(&key()).expect("url");
        assert!(url.as_str().starts_with("http://localhost:4443/gcs/storage/v1/b/b/o/"));
    }

    #[rstest]
    fn rejects_endpoint_without_base() {
        let result = GcsBlobStore::new(GcsConfig {
            bucket: "b".to_owned(),
            endpoint: Url::parse("mailto:ops@example.com").expect("url"),
            access_token: None,
            timeout: Duration::from_secs(5),
        });
        assert!(matches!(result, Err(GcsSetupError::Endpoint { .. })));
    }

    #[rstest]
    fn debug_output_redacts_token(store: GcsBlobStore) {
        let rendered = format!("{store:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[rstest]
    #[case::missing(StatusCode::NOT_FOUND, true)]
    #[case::forbidden(StatusCode::FORBIDDEN, false)]
    #[case::server_error(StatusCode::SERVICE_UNAVAILABLE, false)]
    fn maps_statuses(#[case] status: StatusCode, #[case] not_found: bool) {
        let error = map_status_error(&key(), status, b"{\"error\": \"nope\"}", |message| {
            BlobStoreError::write(message)
        });
        if not_found {
            assert!(matches!(error, BlobStoreError::NotFound { .. }));
        } else {
            assert!(matches!(error, BlobStoreError::Write { .. }));
            assert!(error.to_string().contains(&status.as_u16().to_string()));
        }
    }

    #[test]
    fn body_preview_truncates_long_payloads() {
        let body = "x".repeat(400);
        let preview = body_preview(body.as_bytes());
        assert!(preview.ends_with("..."));
        assert_eq!(preview.len(), 163);
    }
}

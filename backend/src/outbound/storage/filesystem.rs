//! Blob store rooted in a single local directory.
//!
//! All access goes through a `cap_std` [`Dir`] handle so keys can never
//! escape the root. Writes land in a hidden temporary file that is renamed
//! over the target once synced, so readers never observe a partial image.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::{Dir, OpenOptions};
use uuid::Uuid;

use crate::domain::ports::{BlobStore, BlobStoreError, StoredBlob};
use crate::domain::{BlobKey, IMAGE_CONTENT_TYPE, ImageData, ImageLocator};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Filesystem-backed [`BlobStore`].
#[derive(Clone)]
pub struct FilesystemBlobStore {
    root: Arc<Dir>,
    public_base_url: String,
}

impl FilesystemBlobStore {
    /// Open (creating if needed) the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Write`] when the directory cannot be created
    /// or opened.
    pub fn open(path: &Path, public_base_url: impl Into<String>) -> Result<Self, BlobStoreError> {
        Dir::create_ambient_dir_all(path, ambient_authority())
            .map_err(|err| BlobStoreError::write(format!("{}: {err}", path.display())))?;
        let root = Dir::open_ambient_dir(path, ambient_authority())
            .map_err(|err| BlobStoreError::write(format!("{}: {err}", path.display())))?;
        Ok(Self {
            root: Arc::new(root),
            public_base_url: public_base_url.into(),
        })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, BlobStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> Result<T, BlobStoreError> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || op(&root))
            .await
            .map_err(|err| BlobStoreError::write(format!("filesystem task failed: {err}")))?
    }
}

fn content_type_for(key: &str) -> &'static str {
    let extension = Path::new(key)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => IMAGE_CONTENT_TYPE,
        _ => FALLBACK_CONTENT_TYPE,
    }
}

fn write_atomic(dir: &Dir, key: &str, bytes: &[u8]) -> io::Result<()> {
    let tmp_name = format!(".{key}.tmp.{}", Uuid::new_v4().simple());
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    let written = dir.open_with(&tmp_name, &options).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(err) = written.and_then(|()| dir.rename(&tmp_name, dir, key)) {
        drop(dir.remove_file(&tmp_name));
        return Err(err);
    }
    Ok(())
}

fn map_io_error(
    key: &str,
    err: io::Error,
    otherwise: fn(String) -> BlobStoreError,
) -> BlobStoreError {
    if err.kind() == io::ErrorKind::NotFound {
        BlobStoreError::not_found(key)
    } else {
        otherwise(format!("{key}: {err}"))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(
        &self,
        key: &BlobKey,
        image: &ImageData,
        _content_type: &str,
    ) -> Result<ImageLocator, BlobStoreError> {
        let name = key.to_string();
        let bytes = image.as_bytes().to_vec();
        self.blocking(move |dir| {
            write_atomic(dir, &name, &bytes)
                .map_err(|err| BlobStoreError::write(format!("{name}: {err}")))
        })
        .await?;
        Ok(self.locator(key))
    }

    async fn fetch(&self, key: &BlobKey) -> Result<StoredBlob, BlobStoreError> {
        let name = key.to_string();
        self.blocking(move |dir| {
            let bytes = dir
                .read(&name)
                .map_err(|err| map_io_error(&name, err, |message| BlobStoreError::read(message)))?;
            Ok(StoredBlob {
                bytes,
                content_type: content_type_for(&name).to_owned(),
            })
        })
        .await
    }

    async fn delete(&self, key: &BlobKey) -> Result<(), BlobStoreError> {
        let name = key.to_string();
        self.blocking(move |dir| {
            dir.remove_file(&name)
                .map_err(|err| map_io_error(&name, err, |message| BlobStoreError::write(message)))
        })
        .await
    }

    fn locator(&self, key: &BlobKey) -> ImageLocator {
        ImageLocator::join(&self.public_base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        store: FilesystemBlobStore,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let tmp = TempDir::new().expect("temp dir");
        let store = FilesystemBlobStore::open(&tmp.path().join("blobs"), "http://localhost/images")
            .expect("open store");
        Fixture { _tmp: tmp, store }
    }

    fn key(name: &str) -> BlobKey {
        BlobKey::new(name).expect("key")
    }

    #[rstest]
    #[tokio::test]
    async fn put_then_fetch_round_trips_bytes(fixture: Fixture) {
        let image = ImageData::new(vec![0xff, 0xd8, 0xff]).expect("image");
        let locator = fixture
            .store
            .put(&key("a.jpg"), &image, IMAGE_CONTENT_TYPE)
            .await
            .expect("put");
        assert_eq!(locator.as_ref(), "http://localhost/images/a.jpg");

        let stored = fixture.store.fetch(&key("a.jpg")).await.expect("fetch");
        assert_eq!(stored.bytes, vec![0xff, 0xd8, 0xff]);
        assert_eq!(stored.content_type, IMAGE_CONTENT_TYPE);
    }

    #[rstest]
    #[tokio::test]
    async fn put_leaves_no_temporary_files(fixture: Fixture) {
        let image = ImageData::new(vec![1, 2, 3]).expect("image");
        fixture
            .store
            .put(&key("a.jpg"), &image, IMAGE_CONTENT_TYPE)
            .await
            .expect("put");

        let names: Vec<String> = fixture
            .store
            .root
            .entries()
            .expect("list")
            .map(|entry| {
                entry
                    .expect("entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, vec!["a.jpg".to_owned()]);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_removes_and_then_reports_missing(fixture: Fixture) {
        let image = ImageData::new(vec![1]).expect("image");
        fixture
            .store
            .put(&key("a.jpg"), &image, IMAGE_CONTENT_TYPE)
            .await
            .expect("put");

        fixture.store.delete(&key("a.jpg")).await.expect("delete");
        assert_eq!(
            fixture.store.delete(&key("a.jpg")).await,
            Err(BlobStoreError::not_found("a.jpg"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn fetch_of_missing_key_is_not_found(fixture: Fixture) {
        assert_eq!(
            fixture.store.fetch(&key("missing.jpg")).await,
            Err(BlobStoreError::not_found("missing.jpg"))
        );
    }

    #[rstest]
    #[case("a.jpg", IMAGE_CONTENT_TYPE)]
    #[case("a.JPEG", IMAGE_CONTENT_TYPE)]
    #[case("a.bin", FALLBACK_CONTENT_TYPE)]
    fn content_type_follows_extension(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(content_type_for(name), expected);
    }
}

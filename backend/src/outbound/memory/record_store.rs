//! In-process record store keyed by user id.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ports::{RecordChanges, RecordStore, RecordStoreError};
use crate::domain::{RecordField, UserDocument, UserId, UserRecord, attributes};

/// Record store holding documents in a map guarded by an async lock.
///
/// The conditional insert holds the write lock across the email check and
/// the insert, so it is atomic with respect to every other writer.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    documents: RwLock<HashMap<String, UserDocument>>,
}

impl InMemoryRecordStore {
    /// Build an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with raw documents keyed by id.
    ///
    /// Documents need not be well formed; this is how legacy or hand-edited
    /// data is reproduced.
    pub fn with_documents(documents: impl IntoIterator<Item = (String, UserDocument)>) -> Self {
        Self {
            documents: RwLock::new(documents.into_iter().collect()),
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, id: &UserId) -> Result<Option<UserDocument>, RecordStoreError> {
        Ok(self.documents.read().await.get(id.as_ref()).cloned())
    }

    async fn scan_all(&self) -> Result<Vec<UserDocument>, RecordStoreError> {
        Ok(self.documents.read().await.values().cloned().collect())
    }

    async fn find_by_field(
        &self,
        field: RecordField,
        value: &str,
    ) -> Result<Vec<UserDocument>, RecordStoreError> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .filter(|document| document.matches(field, value))
            .cloned()
            .collect())
    }

    async fn insert(&self, record: &UserRecord) -> Result<(), RecordStoreError> {
        self.documents
            .write()
            .await
            .insert(record.id().to_string(), UserDocument::from(record));
        Ok(())
    }

    async fn insert_if_email_absent(&self, record: &UserRecord) -> Result<(), RecordStoreError> {
        let mut documents = self.documents.write().await;
        let email = record.email().as_ref();
        if documents
            .values()
            .any(|document| document.get(attributes::EMAIL) == Some(email))
        {
            return Err(RecordStoreError::email_taken(email));
        }
        documents.insert(record.id().to_string(), UserDocument::from(record));
        Ok(())
    }

    async fn update(&self, id: &UserId, changes: &RecordChanges) -> Result<(), RecordStoreError> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(id.as_ref())
            .ok_or_else(|| RecordStoreError::not_found(id.as_ref()))?;
        changes.apply_to(document);
        Ok(())
    }

    async fn delete(&self, id: &UserId) -> Result<(), RecordStoreError> {
        self.documents
            .write()
            .await
            .remove(id.as_ref())
            .map(|_| ())
            .ok_or_else(|| RecordStoreError::not_found(id.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{BlobKey, Email, ImageLocator, UserName};
    use rstest::{fixture, rstest};

    fn record(email: &str) -> UserRecord {
        let id = UserId::random();
        let key = BlobKey::for_user(&id);
        UserRecord::new(
            id,
            UserName::new("Ada").expect("name"),
            Email::new(email).expect("email"),
            ImageLocator::join("http://localhost/images", &key),
            key,
        )
    }

    #[fixture]
    fn store() -> InMemoryRecordStore {
        InMemoryRecordStore::new()
    }

    #[rstest]
    #[tokio::test]
    async fn insert_then_get_returns_document(store: InMemoryRecordStore) {
        let record = record("ada@x.com");
        store.insert(&record).await.expect("insert");

        let document = store.get(record.id()).await.expect("get").expect("present");
        assert_eq!(UserRecord::try_from(&document).expect("convert"), record);
    }

    #[rstest]
    #[tokio::test]
    async fn plain_insert_does_not_enforce_uniqueness(store: InMemoryRecordStore) {
        store.insert(&record("ada@x.com")).await.expect("first");
        store.insert(&record("ada@x.com")).await.expect("second");

        let matches = store
            .find_by_field(RecordField::Email, "ada@x.com")
            .await
            .expect("lookup");
        assert_eq!(matches.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn conditional_insert_rejects_taken_email(store: InMemoryRecordStore) {
        store
            .insert_if_email_absent(&record("ada@x.com"))
            .await
            .expect("first insert");

        let err = store
            .insert_if_email_absent(&record("ada@x.com"))
            .await
            .expect_err("duplicate");
        assert_eq!(err, RecordStoreError::email_taken("ada@x.com"));
        assert_eq!(store.len().await, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn concurrent_conditional_inserts_admit_one_winner() {
        let store = Arc::new(InMemoryRecordStore::new());
        let attempts = (0..8).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.insert_if_email_absent(&record("ada@x.com")).await })
        });

        let mut successes = 0;
        for attempt in attempts {
            if attempt.await.expect("task joins").is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.len().await, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn update_and_delete_report_missing_ids(store: InMemoryRecordStore) {
        let id = UserId::random();
        let changes = RecordChanges::default();

        assert_eq!(
            store.update(&id, &changes).await,
            Err(RecordStoreError::not_found(id.as_ref()))
        );
        assert_eq!(
            store.delete(&id).await,
            Err(RecordStoreError::not_found(id.as_ref()))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn update_changes_identity_only(store: InMemoryRecordStore) {
        let record = record("ada@x.com");
        store.insert(&record).await.expect("insert");

        let changes = RecordChanges::identity(
            UserName::new("Grace").expect("name"),
            Email::new("grace@x.com").expect("email"),
        );
        store.update(record.id(), &changes).await.expect("update");

        let document = store.get(record.id()).await.expect("get").expect("present");
        assert_eq!(document.get(attributes::EMAIL), Some("grace@x.com"));
        assert_eq!(
            document.get(attributes::IMAGE_LOCATOR),
            Some(record.image_locator().as_ref())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn seeded_documents_are_scanned_verbatim() {
        let store = InMemoryRecordStore::with_documents([
            ("empty".to_owned(), UserDocument::new()),
            (
                "partial".to_owned(),
                UserDocument::new().with(attributes::NAME, "Ada"),
            ),
        ]);

        let documents = store.scan_all().await.expect("scan");
        assert_eq!(documents.len(), 2);
        assert!(documents.iter().any(UserDocument::is_empty));
    }
}

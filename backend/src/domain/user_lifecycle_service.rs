//! User record lifecycle coordinator.
//!
//! Sequences calls to the record store and the blob store for the create,
//! list, update and delete use-cases. The two stores share no transaction, so
//! each operation orders its writes such that a failure leaves at worst an
//! orphaned blob, never a record pointing at a missing image.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    BlobStore, BlobStoreError, CreateUserRequest, CreatedUser, DeleteUserRequest, RecordChanges,
    RecordRef, RecordStore, RecordStoreError, StoredBlob, UpdateUserRequest, UploadIntent,
    UploadIntentLog, UploadIntentLogError, UserLifecycleCommand, UserLifecycleQuery, UserListing,
};
use crate::domain::{
    BlobKey, Error, IMAGE_CONTENT_TYPE, IdentityPolicy, UserDocument, UserId, UserRecord,
    attributes,
};

const USER_NOT_FOUND: &str = "User not found.";
const DUPLICATE_EMAIL: &str = "User with this email already exists.";

fn duplicate_email() -> Error {
    Error::invalid_request(DUPLICATE_EMAIL).with_details(json!({
        "field": "email",
        "code": "duplicate_email",
    }))
}

fn user_not_found() -> Error {
    Error::not_found(USER_NOT_FOUND)
}

fn record_store_failure(err: RecordStoreError) -> Error {
    Error::internal(err.to_string()).with_details(json!({ "code": "record_store_failed" }))
}

fn storage_write_failure(err: BlobStoreError) -> Error {
    Error::internal(err.to_string()).with_details(json!({ "code": "storage_write_failed" }))
}

fn intent_log_failure(err: UploadIntentLogError) -> Error {
    Error::internal(err.to_string()).with_details(json!({ "code": "intent_log_failed" }))
}

/// Lifecycle coordinator implementing the driving ports.
pub struct UserLifecycleService<R, B, L> {
    records: Arc<R>,
    blobs: Arc<B>,
    intents: Arc<L>,
    identity: IdentityPolicy<R>,
    clock: Arc<dyn Clock>,
}

impl<R, B, L> Clone for UserLifecycleService<R, B, L> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            blobs: Arc::clone(&self.blobs),
            intents: Arc::clone(&self.intents),
            identity: self.identity.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, B, L> UserLifecycleService<R, B, L> {
    /// Create a coordinator over the given stores.
    ///
    /// `clock` stamps upload intents.
    pub fn new(records: Arc<R>, blobs: Arc<B>, intents: Arc<L>, clock: Arc<dyn Clock>) -> Self {
        let identity = IdentityPolicy::new(Arc::clone(&records));
        Self {
            records,
            blobs,
            intents,
            identity,
            clock,
        }
    }
}

impl<R, B, L> UserLifecycleService<R, B, L>
where
    R: RecordStore,
    B: BlobStore,
    L: UploadIntentLog,
{
    async fn clear_intent(&self, user_id: &UserId) {
        if let Err(err) = self.intents.complete(user_id).await {
            warn!(user_id = %user_id, error = %err, "failed to clear upload intent");
        }
    }

    /// Remove the blob of a create that lost the email race.
    ///
    /// The intent is only cleared once the blob is gone so the reconciler can
    /// retry a failed delete.
    async fn discard_blob(&self, user_id: &UserId, key: &BlobKey) {
        match self.blobs.delete(key).await {
            Ok(()) | Err(BlobStoreError::NotFound { .. }) => self.clear_intent(user_id).await,
            Err(err) => warn!(
                user_id = %user_id,
                blob_key = %key,
                error = %err,
                "failed to discard blob of rejected create; left for reconciliation"
            ),
        }
    }

    async fn existing_document(&self, id: &RecordRef) -> Result<(UserId, UserDocument), Error> {
        let RecordRef::Known(id) = id else {
            return Err(user_not_found());
        };
        let document = self
            .records
            .get(id)
            .await
            .map_err(record_store_failure)?
            .filter(|document| !document.is_empty())
            .ok_or_else(user_not_found)?;
        Ok((id.clone(), document))
    }
}

#[async_trait]
impl<R, B, L> UserLifecycleCommand for UserLifecycleService<R, B, L>
where
    R: RecordStore,
    B: BlobStore,
    L: UploadIntentLog,
{
    async fn create(&self, request: CreateUserRequest) -> Result<CreatedUser, Error> {
        if self
            .identity
            .is_email_taken(request.email())
            .await
            .map_err(record_store_failure)?
        {
            return Err(duplicate_email());
        }

        let id = self.identity.new_id();
        let intent = UploadIntent::for_user(id.clone(), self.clock.utc());
        self.intents
            .begin(&intent)
            .await
            .map_err(intent_log_failure)?;

        // A failed put keeps its intent: the object may exist partially.
        let locator = self
            .blobs
            .put(&intent.blob_key, request.image(), IMAGE_CONTENT_TYPE)
            .await
            .map_err(storage_write_failure)?;

        let record = UserRecord::new(
            id.clone(),
            request.name().clone(),
            request.email().clone(),
            locator,
            intent.blob_key.clone(),
        );

        match self.records.insert_if_email_absent(&record).await {
            Ok(()) => {
                self.clear_intent(&id).await;
                info!(user_id = %id, "user created");
                Ok(CreatedUser { id })
            }
            Err(RecordStoreError::EmailTaken { .. }) => {
                debug!(user_id = %id, "concurrent create registered the email first");
                self.discard_blob(&id, &intent.blob_key).await;
                Err(duplicate_email())
            }
            Err(err) => {
                error!(
                    user_id = %id,
                    blob_key = %intent.blob_key,
                    error = %err,
                    "record insert failed after blob upload; blob left for reconciliation"
                );
                Err(record_store_failure(err))
            }
        }
    }

    async fn update(&self, request: UpdateUserRequest) -> Result<(), Error> {
        let (id, _) = self.existing_document(request.id()).await?;

        // Email uniqueness is not re-checked on update.
        let changes = RecordChanges::identity(request.name().clone(), request.email().clone());
        self.records
            .update(&id, &changes)
            .await
            .map_err(|err| match err {
                RecordStoreError::NotFound { .. } => user_not_found(),
                other => record_store_failure(other),
            })?;

        info!(user_id = %id, "user updated");
        Ok(())
    }

    async fn delete(&self, request: DeleteUserRequest) -> Result<(), Error> {
        let (id, document) = self.existing_document(request.id()).await?;
        let key = document.blob_key().map_err(|err| {
            Error::internal(format!("stored record {id} has no usable image key: {err}"))
                .with_details(json!({ "code": "record_store_failed" }))
        })?;

        match self.blobs.delete(&key).await {
            Ok(()) => {}
            Err(BlobStoreError::NotFound { .. }) => {
                warn!(user_id = %id, blob_key = %key, "profile image already absent");
            }
            Err(err) => return Err(storage_write_failure(err)),
        }

        self.records.delete(&id).await.map_err(|err| match err {
            RecordStoreError::NotFound { .. } => user_not_found(),
            other => record_store_failure(other),
        })?;

        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[async_trait]
impl<R, B, L> UserLifecycleQuery for UserLifecycleService<R, B, L>
where
    R: RecordStore,
    B: BlobStore,
    L: UploadIntentLog,
{
    async fn list_users(&self) -> Result<UserListing, Error> {
        let documents = self
            .records
            .scan_all()
            .await
            .map_err(record_store_failure)?;
        if documents.is_empty() {
            return Ok(UserListing::Empty);
        }

        let users = documents
            .iter()
            .filter(|document| !document.is_empty())
            .filter_map(|document| match UserRecord::try_from(document) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(
                        document_id = document.get(attributes::ID).unwrap_or("<missing>"),
                        error = %err,
                        "skipping malformed user document"
                    );
                    None
                }
            })
            .collect();
        Ok(UserListing::Users(users))
    }

    async fn fetch_image(&self, key: &BlobKey) -> Result<StoredBlob, Error> {
        self.blobs.fetch(key).await.map_err(|err| match err {
            BlobStoreError::NotFound { .. } => Error::not_found("Image not found."),
            other => Error::internal(other.to_string())
                .with_details(json!({ "code": "storage_read_failed" })),
        })
    }
}

#[cfg(test)]
#[path = "user_lifecycle_service_tests.rs"]
mod tests;

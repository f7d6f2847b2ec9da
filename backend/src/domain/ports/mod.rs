//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod blob_store;
mod record_store;
mod upload_intent_log;
mod user_lifecycle;

#[cfg(test)]
pub use blob_store::MockBlobStore;
pub use blob_store::{BlobStore, BlobStoreError, StoredBlob};
#[cfg(test)]
pub use record_store::MockRecordStore;
pub use record_store::{RecordChanges, RecordStore, RecordStoreError};
#[cfg(test)]
pub use upload_intent_log::MockUploadIntentLog;
pub use upload_intent_log::{
    NoOpUploadIntentLog, UploadIntent, UploadIntentLog, UploadIntentLogError,
};
#[cfg(test)]
pub use user_lifecycle::{MockUserLifecycleCommand, MockUserLifecycleQuery};
pub use user_lifecycle::{
    CREATE_FIELDS, CreateUserRequest, CreatedUser, DELETE_FIELDS, DeleteUserRequest,
    MISSING_FIELD_CODE, RecordRef, UPDATE_FIELDS, UpdateUserRequest, UserLifecycleCommand,
    UserLifecycleQuery, UserListing, missing_fields,
};

//! In-memory adapters for local development and tests.
//!
//! State lives for the lifetime of the process only.

mod blob_store;
mod record_store;
mod upload_intent_log;

pub use blob_store::InMemoryBlobStore;
pub use record_store::InMemoryRecordStore;
pub use upload_intent_log::InMemoryUploadIntentLog;

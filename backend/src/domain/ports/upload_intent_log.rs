//! Write-ahead log of blob uploads whose record insert has not completed.
//!
//! A create records an intent before writing the blob and clears it once the
//! record exists. Intents that outlive a grace period point at blobs that may
//! have no owning record; the orphan reconciler drains them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{BlobKey, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by upload intent log adapters.
    pub enum UploadIntentLogError {
        /// Log connection could not be established.
        Connection { message: String } => "upload intent log connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "upload intent log query failed: {message}",
    }
}

/// A blob written on behalf of a record that may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadIntent {
    /// Record the blob belongs to once the insert lands.
    pub user_id: UserId,
    /// Key the blob is written under.
    pub blob_key: BlobKey,
    /// When the intent was recorded.
    pub created_at: DateTime<Utc>,
}

impl UploadIntent {
    /// Intent for the profile image of `user_id`, stamped `created_at`.
    pub fn for_user(user_id: UserId, created_at: DateTime<Utc>) -> Self {
        let blob_key = BlobKey::for_user(&user_id);
        Self {
            user_id,
            blob_key,
            created_at,
        }
    }
}

/// Persistence port for upload intents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UploadIntentLog: Send + Sync {
    /// Record an intent before the blob is written.
    async fn begin(&self, intent: &UploadIntent) -> Result<(), UploadIntentLogError>;

    /// Clear the intent of `user_id`. Clearing an absent intent succeeds.
    async fn complete(&self, user_id: &UserId) -> Result<(), UploadIntentLogError>;

    /// Intents created strictly before `cutoff`, oldest first.
    async fn pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<UploadIntent>, UploadIntentLogError>;
}

/// Intent log that records nothing, for deployments without orphan tracking.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpUploadIntentLog;

#[async_trait]
impl UploadIntentLog for NoOpUploadIntentLog {
    async fn begin(&self, _intent: &UploadIntent) -> Result<(), UploadIntentLogError> {
        Ok(())
    }

    async fn complete(&self, _user_id: &UserId) -> Result<(), UploadIntentLogError> {
        Ok(())
    }

    async fn pending_before(
        &self,
        _cutoff: DateTime<Utc>,
    ) -> Result<Vec<UploadIntent>, UploadIntentLogError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_op_log_never_reports_pending_intents() {
        let log = NoOpUploadIntentLog;
        let intent = UploadIntent::for_user(UserId::random(), Utc::now());

        log.begin(&intent).await.expect("begin succeeds");
        let pending = log
            .pending_before(Utc::now() + chrono::Duration::hours(1))
            .await
            .expect("pending succeeds");

        assert!(pending.is_empty());
    }

    #[test]
    fn intent_key_follows_user_id() {
        let user_id = UserId::random();
        let intent = UploadIntent::for_user(user_id.clone(), Utc::now());
        assert_eq!(intent.blob_key, BlobKey::for_user(&user_id));
    }
}

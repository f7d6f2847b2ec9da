//! In-process upload intent log.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::UserId;
use crate::domain::ports::{UploadIntent, UploadIntentLog, UploadIntentLogError};

/// Intent log kept in memory; lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryUploadIntentLog {
    intents: Mutex<HashMap<UserId, UploadIntent>>,
}

impl InMemoryUploadIntentLog {
    /// Build an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding intents.
    pub async fn len(&self) -> usize {
        self.intents.lock().await.len()
    }

    /// Whether no intent is outstanding.
    pub async fn is_empty(&self) -> bool {
        self.intents.lock().await.is_empty()
    }
}

#[async_trait]
impl UploadIntentLog for InMemoryUploadIntentLog {
    async fn begin(&self, intent: &UploadIntent) -> Result<(), UploadIntentLogError> {
        self.intents
            .lock()
            .await
            .insert(intent.user_id.clone(), intent.clone());
        Ok(())
    }

    async fn complete(&self, user_id: &UserId) -> Result<(), UploadIntentLogError> {
        self.intents.lock().await.remove(user_id);
        Ok(())
    }

    async fn pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<UploadIntent>, UploadIntentLogError> {
        let mut pending: Vec<UploadIntent> = self
            .intents
            .lock()
            .await
            .values()
            .filter(|intent| intent.created_at < cutoff)
            .cloned()
            .collect();
        pending.sort_by_key(|intent| intent.created_at);
        Ok(pending)
    }
}

//! Background clean-up of blobs whose record never landed.
//!
//! A create that fails between the blob upload and the record insert leaves
//! an [`UploadIntent`] behind. Once an intent is older than the grace period
//! the reconciler decides its fate: if the record exists the intent is simply
//! cleared, otherwise the blob is deleted first and the intent cleared after.
//! Any failure leaves the intent for the next pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    BlobStore, BlobStoreError, RecordStore, UploadIntent, UploadIntentLog, UploadIntentLogError,
};

/// Outcome counters of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Intents older than the grace period.
    pub examined: usize,
    /// Orphaned blobs deleted.
    pub removed: usize,
    /// Intents whose record exists; only the intent was cleared.
    pub retained: usize,
    /// Intents left in place after an error.
    pub failed: usize,
}

enum Resolution {
    Removed,
    Retained,
}

/// Drains stale upload intents.
pub struct OrphanReconciler<R, B, L> {
    records: Arc<R>,
    blobs: Arc<B>,
    intents: Arc<L>,
    grace: TimeDelta,
}

impl<R, B, L> OrphanReconciler<R, B, L>
where
    R: RecordStore,
    B: BlobStore,
    L: UploadIntentLog,
{
    /// Build a reconciler ignoring intents younger than `grace`.
    pub fn new(records: Arc<R>, blobs: Arc<B>, intents: Arc<L>, grace: Duration) -> Self {
        Self {
            records,
            blobs,
            intents,
            grace: TimeDelta::from_std(grace).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Run one pass over intents created before `now - grace`.
    ///
    /// # Errors
    ///
    /// Fails only when the pending intents cannot be listed; per-intent
    /// failures are counted in [`ReconcileReport::failed`].
    pub async fn reconcile(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ReconcileReport, UploadIntentLogError> {
        let Some(cutoff) = now.checked_sub_signed(self.grace) else {
            return Ok(ReconcileReport::default());
        };
        let pending = self.intents.pending_before(cutoff).await?;
        let mut report = ReconcileReport {
            examined: pending.len(),
            ..ReconcileReport::default()
        };

        for intent in &pending {
            match self.resolve(intent).await {
                Ok(Resolution::Removed) => report.removed += 1,
                Ok(Resolution::Retained) => report.retained += 1,
                Err(reason) => {
                    warn!(
                        user_id = %intent.user_id,
                        blob_key = %intent.blob_key,
                        error = %reason,
                        "upload intent left for the next pass"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.examined > 0 {
            info!(
                examined = report.examined,
                removed = report.removed,
                retained = report.retained,
                failed = report.failed,
                "orphan reconciliation pass finished"
            );
        }
        Ok(report)
    }

    /// Run [`Self::reconcile`] every `interval` until the task is dropped.
    pub async fn run(self, clock: Arc<dyn Clock>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = self.reconcile(clock.utc()).await {
                warn!(error = %err, "orphan reconciliation pass failed");
            }
        }
    }

    async fn resolve(&self, intent: &UploadIntent) -> Result<Resolution, String> {
        let record = self
            .records
            .get(&intent.user_id)
            .await
            .map_err(|err| err.to_string())?;

        let resolution = if record.is_some_and(|document| !document.is_empty()) {
            Resolution::Retained
        } else {
            match self.blobs.delete(&intent.blob_key).await {
                Ok(()) => debug!(blob_key = %intent.blob_key, "deleted orphaned blob"),
                Err(BlobStoreError::NotFound { .. }) => {
                    debug!(blob_key = %intent.blob_key, "orphaned blob already absent");
                }
                Err(err) => return Err(err.to_string()),
            }
            Resolution::Removed
        };

        self.intents
            .complete(&intent.user_id)
            .await
            .map_err(|err| err.to_string())?;
        Ok(resolution)
    }
}

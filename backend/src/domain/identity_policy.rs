//! Identity rules for user records: unique emails and fresh identifiers.

use std::sync::Arc;

use crate::domain::ports::{RecordStore, RecordStoreError};
use crate::domain::{Email, RecordField, UserId};

/// Enforces that no two live records share an email.
///
/// The lookup here is advisory: it rejects obvious duplicates before any
/// write happens. The conditional insert of the record store is what closes
/// the race between two concurrent creates.
pub struct IdentityPolicy<R> {
    records: Arc<R>,
}

impl<R> Clone for IdentityPolicy<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<R> IdentityPolicy<R> {
    /// Create a policy backed by `records`.
    pub fn new(records: Arc<R>) -> Self {
        Self { records }
    }

    /// Generate an identifier for a new record.
    pub fn new_id(&self) -> UserId {
        UserId::random()
    }
}

impl<R: RecordStore> IdentityPolicy<R> {
    /// Whether any stored record already uses `email`.
    pub async fn is_email_taken(&self, email: &Email) -> Result<bool, RecordStoreError> {
        let matches = self
            .records
            .find_by_field(RecordField::Email, email.as_ref())
            .await?;
        Ok(!matches.is_empty())
    }
}

//! Port abstraction for the user record store and its errors.
//!
//! Stores traffic in flat [`UserDocument`]s rather than typed records: a
//! scan may surface empty or hand-edited documents, and the lifecycle
//! service decides how to treat them.

use async_trait::async_trait;

use crate::domain::{Email, RecordField, UserDocument, UserId, UserName, UserRecord, attributes};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by record store adapters.
    pub enum RecordStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "record store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "record store query failed: {message}",
        /// No record exists under the identifier.
        NotFound { id: String } => "record {id} does not exist",
        /// A live record already holds the email address.
        EmailTaken { email: String } => "email {email} is already registered",
    }
}

/// Partial field update applied by [`RecordStore::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordChanges {
    /// New name, if it changes.
    pub name: Option<UserName>,
    /// New email, if it changes.
    pub email: Option<Email>,
}

impl RecordChanges {
    /// Replace both identity attributes.
    pub fn identity(name: UserName, email: Email) -> Self {
        Self {
            name: Some(name),
            email: Some(email),
        }
    }

    /// Whether the update touches no attribute.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }

    /// Apply the changes to a stored document.
    pub fn apply_to(&self, document: &mut UserDocument) {
        if let Some(name) = &self.name {
            document.set(attributes::NAME, name.as_ref());
        }
        if let Some(email) = &self.email {
            document.set(attributes::EMAIL, email.as_ref());
        }
    }
}

/// Document store keyed by user id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one document; `None` when the id is unknown.
    async fn get(&self, id: &UserId) -> Result<Option<UserDocument>, RecordStoreError>;

    /// Return every stored document in unspecified order.
    async fn scan_all(&self) -> Result<Vec<UserDocument>, RecordStoreError>;

    /// Return the documents whose `field` equals `value` exactly.
    async fn find_by_field(
        &self,
        field: RecordField,
        value: &str,
    ) -> Result<Vec<UserDocument>, RecordStoreError>;

    /// Create or overwrite a record without any uniqueness check.
    async fn insert(&self, record: &UserRecord) -> Result<(), RecordStoreError>;

    /// Insert a record unless another record already holds its email.
    ///
    /// The check and the write are atomic with respect to other callers of
    /// this method. Fails with [`RecordStoreError::EmailTaken`] otherwise.
    async fn insert_if_email_absent(&self, record: &UserRecord) -> Result<(), RecordStoreError>;

    /// Apply `changes` to an existing record.
    ///
    /// Fails with [`RecordStoreError::NotFound`] when the id is unknown.
    async fn update(&self, id: &UserId, changes: &RecordChanges) -> Result<(), RecordStoreError>;

    /// Remove a record.
    ///
    /// Fails with [`RecordStoreError::NotFound`] when the id is unknown.
    async fn delete(&self, id: &UserId) -> Result<(), RecordStoreError>;
}

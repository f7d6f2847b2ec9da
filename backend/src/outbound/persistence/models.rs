//! Internal Diesel row structs.
//!
//! Never exposed to the domain; the adapters convert to and from
//! [`UserDocument`] and [`UploadIntent`] at the boundary.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::ports::{RecordChanges, UploadIntent};
use crate::domain::{BlobKey, UserDocument, UserId, UserRecord, attributes};

use super::schema::{upload_intents, user_records};

/// Row read from `user_records`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRecordRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image_locator: String,
    pub image_key: Option<String>,
}

impl From<UserRecordRow> for UserDocument {
    fn from(row: UserRecordRow) -> Self {
        let document = UserDocument::new()
            .with(attributes::ID, row.id.to_string())
            .with(attributes::NAME, row.name)
            .with(attributes::EMAIL, row.email)
            .with(attributes::IMAGE_LOCATOR, row.image_locator);
        match row.image_key {
            Some(key) => document.with(attributes::IMAGE_KEY, key),
            None => document,
        }
    }
}

/// Insertable row for `user_records`; `created_at` takes the column default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_records)]
pub(crate) struct NewUserRecordRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub email: &'a str,
    pub image_locator: &'a str,
    pub image_key: Option<&'a str>,
}

impl<'a> From<&'a UserRecord> for NewUserRecordRow<'a> {
    fn from(record: &'a UserRecord) -> Self {
        Self {
            id: *record.id().as_uuid(),
            name: record.name().as_ref(),
            email: record.email().as_ref(),
            image_locator: record.image_locator().as_ref(),
            image_key: Some(record.image_key().as_ref()),
        }
    }
}

/// Partial update of `user_records`; `None` columns are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = user_records)]
pub(crate) struct UserRecordUpdate<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
}

impl<'a> From<&'a RecordChanges> for UserRecordUpdate<'a> {
    fn from(changes: &'a RecordChanges) -> Self {
        Self {
            name: changes.name.as_ref().map(|name| name.as_ref()),
            email: changes.email.as_ref().map(|email| email.as_ref()),
        }
    }
}

/// Row read from `upload_intents`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = upload_intents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UploadIntentRow {
    pub user_id: Uuid,
    pub blob_key: String,
    pub created_at: DateTime<Utc>,
}

impl UploadIntentRow {
    pub(crate) fn into_intent(self) -> Result<UploadIntent, String> {
        let blob_key = BlobKey::new(self.blob_key.clone())
            .map_err(|err| format!("invalid blob key `{}`: {err}", self.blob_key))?;
        Ok(UploadIntent {
            user_id: UserId::from_uuid(self.user_id),
            blob_key,
            created_at: self.created_at,
        })
    }
}

/// Insertable row for `upload_intents`.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = upload_intents)]
pub(crate) struct NewUploadIntentRow<'a> {
    pub user_id: Uuid,
    pub blob_key: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a UploadIntent> for NewUploadIntentRow<'a> {
    fn from(intent: &'a UploadIntent) -> Self {
        Self {
            user_id: *intent.user_id.as_uuid(),
            blob_key: intent.blob_key.as_ref(),
            created_at: intent.created_at,
        }
    }
}

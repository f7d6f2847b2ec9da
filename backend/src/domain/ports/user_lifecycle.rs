//! Driving ports for the user record lifecycle.
//!
//! Inbound adapters build the request types below from decoded payloads and
//! call [`UserLifecycleCommand`] / [`UserLifecycleQuery`]. Constructors
//! validate presence of every required field so a request that reaches the
//! service is already well formed.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::{BlobKey, Email, Error, ImageData, UserId, UserName, UserRecord};

use super::StoredBlob;

/// Detail code attached to requests missing a required field.
pub const MISSING_FIELD_CODE: &str = "missing_field";

/// Build the validation error for absent or blank fields.
///
/// `operation_fields` names every field the operation requires and feeds the
/// message; `missing` lists the absent ones in `details.fields`.
pub fn missing_fields(operation_fields: &[&str], missing: &[&str]) -> Error {
    Error::invalid_request(format!(
        "Missing required fields: {}.",
        describe_fields(operation_fields)
    ))
    .with_details(json!({
        "fields": missing,
        "code": MISSING_FIELD_CODE,
    }))
}

fn describe_fields(fields: &[&str]) -> String {
    match fields {
        [] => String::new(),
        [only] => (*only).to_owned(),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}

/// Fields required by a create.
pub const CREATE_FIELDS: [&str; 3] = ["name", "email", "image"];
/// Fields required by an update.
pub const UPDATE_FIELDS: [&str; 3] = ["userId", "name", "email"];
/// Fields required by a delete.
pub const DELETE_FIELDS: [&str; 1] = ["userId"];

/// Validated input of a create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserRequest {
    name: UserName,
    email: Email,
    image: ImageData,
}

impl CreateUserRequest {
    /// Validate raw fields; `None` and blank values count as missing.
    pub fn try_from_parts(
        name: Option<String>,
        email: Option<String>,
        image: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        let name = name.and_then(|value| UserName::new(value).ok());
        let email = email.and_then(|value| Email::new(value).ok());
        let image = image.and_then(|value| ImageData::new(value).ok());
        match (name, email, image) {
            (Some(name), Some(email), Some(image)) => Ok(Self { name, email, image }),
            (name, email, image) => {
                let missing: Vec<&str> = [
                    ("name", name.is_none()),
                    ("email", email.is_none()),
                    ("image", image.is_none()),
                ]
                .into_iter()
                .filter_map(|(field, absent)| absent.then_some(field))
                .collect();
                Err(missing_fields(&CREATE_FIELDS, &missing))
            }
        }
    }

    /// Requested display name.
    pub fn name(&self) -> &UserName {
        &self.name
    }

    /// Requested email; must not already be registered.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Decoded profile image.
    pub fn image(&self) -> &ImageData {
        &self.image
    }
}

/// Reference to an existing record as supplied by a caller.
///
/// A present id that is not a UUID cannot name any record, so it is kept as
/// [`RecordRef::Unknown`] and reported as not found rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRef {
    /// A well-formed record id.
    Known(UserId),
    /// Any other non-blank value, kept verbatim.
    Unknown(String),
}

impl RecordRef {
    fn parse(raw: Option<String>) -> Option<Self> {
        let raw = raw?;
        if raw.trim().is_empty() {
            return None;
        }
        Some(match UserId::new(&raw) {
            Ok(id) => Self::Known(id),
            Err(_) => Self::Unknown(raw),
        })
    }
}

/// Validated input of an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUserRequest {
    id: RecordRef,
    name: UserName,
    email: Email,
}

impl UpdateUserRequest {
    /// Validate raw fields; `None` and blank values count as missing.
    pub fn try_from_parts(
        id: Option<String>,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<Self, Error> {
        let id = RecordRef::parse(id);
        let name = name.and_then(|value| UserName::new(value).ok());
        let email = email.and_then(|value| Email::new(value).ok());
        match (id, name, email) {
            (Some(id), Some(name), Some(email)) => Ok(Self { id, name, email }),
            (id, name, email) => {
                let missing: Vec<&str> = [
                    ("userId", id.is_none()),
                    ("name", name.is_none()),
                    ("email", email.is_none()),
                ]
                .into_iter()
                .filter_map(|(field, absent)| absent.then_some(field))
                .collect();
                Err(missing_fields(&UPDATE_FIELDS, &missing))
            }
        }
    }

    /// Record to update.
    pub fn id(&self) -> &RecordRef {
        &self.id
    }

    /// Replacement name.
    pub fn name(&self) -> &UserName {
        &self.name
    }

    /// Replacement email.
    pub fn email(&self) -> &Email {
        &self.email
    }
}

/// Validated input of a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteUserRequest {
    id: RecordRef,
}

impl DeleteUserRequest {
    /// Validate the raw id; `None` and blank values count as missing.
    pub fn try_from_parts(id: Option<String>) -> Result<Self, Error> {
        RecordRef::parse(id)
            .map(|id| Self { id })
            .ok_or_else(|| missing_fields(&DELETE_FIELDS, &DELETE_FIELDS))
    }

    /// Record to delete.
    pub fn id(&self) -> &RecordRef {
        &self.id
    }
}

/// Outcome of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedUser {
    /// Identifier assigned to the new record.
    pub id: UserId,
}

/// Outcome of a read-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserListing {
    /// The store holds no documents at all.
    Empty,
    /// Every non-empty, well-formed document.
    Users(Vec<UserRecord>),
}

impl UserListing {
    /// Borrow the listed users; empty for [`UserListing::Empty`].
    pub fn users(&self) -> &[UserRecord] {
        match self {
            Self::Empty => &[],
            Self::Users(users) => users.as_slice(),
        }
    }
}

/// Mutating lifecycle operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserLifecycleCommand: Send + Sync {
    /// Register a user and store their profile image.
    async fn create(&self, request: CreateUserRequest) -> Result<CreatedUser, Error>;

    /// Replace name and email of an existing user.
    async fn update(&self, request: UpdateUserRequest) -> Result<(), Error>;

    /// Remove a user and their profile image.
    async fn delete(&self, request: DeleteUserRequest) -> Result<(), Error>;
}

/// Read-only lifecycle operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserLifecycleQuery: Send + Sync {
    /// List every live user.
    async fn list_users(&self) -> Result<UserListing, Error>;

    /// Fetch a stored profile image.
    async fn fetch_image(&self, key: &BlobKey) -> Result<StoredBlob, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    const VALID_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    fn some(value: &str) -> Option<String> {
        Some(value.to_owned())
    }

    #[rstest]
    fn create_request_accepts_complete_input() {
        let request =
            CreateUserRequest::try_from_parts(some("Ada"), some("ada@x.com"), Some(vec![1, 2]))
                .expect("valid request");
        assert_eq!(request.name().as_ref(), "Ada");
        assert_eq!(request.image().len(), 2);
    }

    #[rstest]
    #[case(None, some("ada@x.com"), Some(vec![1]), "name")]
    #[case(some("Ada"), some("  "), Some(vec![1]), "email")]
    #[case(some("Ada"), some("ada@x.com"), Some(Vec::new()), "image")]
    fn create_request_reports_missing_field(
        #[case] name: Option<String>,
        #[case] email: Option<String>,
        #[case] image: Option<Vec<u8>>,
        #[case] field: &str,
    ) {
        let err = CreateUserRequest::try_from_parts(name, email, image)
            .expect_err("incomplete request");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.detail_code(), Some(MISSING_FIELD_CODE));
        assert_eq!(err.message(), "Missing required fields: name, email, or image.");
        let details = err.details().expect("details present");
        assert_eq!(details["fields"], serde_json::json!([field]));
    }

    #[rstest]
    fn update_request_lists_every_missing_field() {
        let err = UpdateUserRequest::try_from_parts(None, None, some("ada@x.com"))
            .expect_err("incomplete request");
        let details = err.details().expect("details present");
        assert_eq!(details["fields"], serde_json::json!(["userId", "name"]));
        assert_eq!(
            err.message(),
            "Missing required fields: userId, name, or email."
        );
    }

    #[rstest]
    fn non_uuid_ids_are_kept_as_unknown_references() {
        let request = DeleteUserRequest::try_from_parts(some("legacy-id")).expect("id present");
        assert_eq!(request.id(), &RecordRef::Unknown("legacy-id".to_owned()));
    }

    #[rstest]
    fn uuid_ids_are_parsed() {
        let request = DeleteUserRequest::try_from_parts(some(VALID_ID)).expect("id present");
        let expected = UserId::new(VALID_ID).expect("valid id");
        assert_eq!(request.id(), &RecordRef::Known(expected));
    }

    #[rstest]
    fn delete_request_requires_id() {
        let err = DeleteUserRequest::try_from_parts(some(" ")).expect_err("blank id");
        assert_eq!(err.message(), "Missing required fields: userId.");
    }

    #[rstest]
    fn empty_listing_has_no_users() {
        assert!(UserListing::Empty.users().is_empty());
    }
}

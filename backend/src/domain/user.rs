//! User record data model.
//!
//! A [`UserRecord`] pairs identity attributes with the object-storage blob
//! holding the profile image. Record stores persist records as flat
//! [`UserDocument`]s; converting a document back into a record is fallible
//! because stored documents may be empty or hand-edited.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content type recorded for every stored profile image.
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

const BLOB_KEY_SUFFIX: &str = ".jpg";

/// Validation errors returned by the record value constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyId,
    InvalidId,
    EmptyName,
    EmptyEmail,
    EmptyImage,
    EmptyLocator,
    InvalidBlobKey,
    MissingAttribute { attribute: &'static str },
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmptyImage => write!(f, "image must not be empty"),
            Self::EmptyLocator => write!(f, "image locator must not be empty"),
            Self::InvalidBlobKey => write!(f, "blob key must be a single path segment"),
            Self::MissingAttribute { attribute } => {
                write!(f, "document is missing the `{attribute}` attribute")
            }
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid, String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid, uuid.to_string())
    }

    fn from_owned(id: String) -> Result<Self, UserValidationError> {
        if id.trim().is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(UserValidationError::InvalidId);
        }

        let parsed = Uuid::parse_str(&id).map_err(|_| UserValidationError::InvalidId)?;
        Ok(Self(parsed, id))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        let UserId(_, raw) = value;
        raw
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

macro_rules! non_empty_text {
    ($(#[$meta:meta])* $name:ident, $error:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and construct the value, rejecting blank input.
            pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(UserValidationError::$error);
                }
                Ok(Self(value))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_ref())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = UserValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

non_empty_text!(
    /// Human readable name of the user.
    UserName,
    EmptyName
);

non_empty_text!(
    /// Email address; compared verbatim when enforcing uniqueness.
    Email,
    EmptyEmail
);

non_empty_text!(
    /// Resolvable public address of a stored blob.
    ImageLocator,
    EmptyLocator
);

impl ImageLocator {
    /// Join a base address and a blob key with exactly one separator.
    ///
    /// # Examples
    /// ```
    /// use profile_registry::domain::{BlobKey, ImageLocator};
    ///
    /// let key = BlobKey::new("a.jpg").unwrap();
    /// let locator = ImageLocator::join("http://localhost:8080/images/", &key);
    /// assert_eq!(locator.as_ref(), "http://localhost:8080/images/a.jpg");
    /// ```
    pub fn join(base: &str, key: &BlobKey) -> Self {
        Self(format!("{}/{}", base.trim_end_matches('/'), key))
    }
}

/// Object-storage key of a profile image.
///
/// Keys are a single path segment. Keys for new records are always derived
/// from the record id as `<id>.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobKey(String);

impl BlobKey {
    /// Validate and construct a key.
    pub fn new(key: impl Into<String>) -> Result<Self, UserValidationError> {
        let key = key.into();
        if key.trim().is_empty()
            || key.trim() != key
            || key.contains(['/', '\\'])
            || key == "."
            || key == ".."
        {
            return Err(UserValidationError::InvalidBlobKey);
        }
        Ok(Self(key))
    }

    /// Derive the key for a user's profile image.
    ///
    /// # Examples
    /// ```
    /// use profile_registry::domain::{BlobKey, UserId};
    ///
    /// let id = UserId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").unwrap();
    /// let key = BlobKey::for_user(&id);
    /// assert_eq!(key.as_ref(), "3fa85f64-5717-4562-b3fc-2c963f66afa6.jpg");
    /// ```
    pub fn for_user(id: &UserId) -> Self {
        Self(format!("{id}{BLOB_KEY_SUFFIX}"))
    }

    /// Recover a key from the last path segment of a locator.
    ///
    /// Only used for documents written before the key was stored explicitly.
    pub fn from_locator(locator: &ImageLocator) -> Result<Self, UserValidationError> {
        let without_fragment = locator
            .as_ref()
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let segment = without_fragment.rsplit('/').next().unwrap_or_default();
        Self::new(segment)
    }
}

impl AsRef<str> for BlobKey {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<BlobKey> for String {
    fn from(value: BlobKey) -> Self {
        value.0
    }
}

impl TryFrom<String> for BlobKey {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Decoded profile image bytes; never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData(Vec<u8>);

impl ImageData {
    /// Wrap decoded bytes, rejecting an empty payload.
    pub fn new(bytes: Vec<u8>) -> Result<Self, UserValidationError> {
        if bytes.is_empty() {
            return Err(UserValidationError::EmptyImage);
        }
        Ok(Self(bytes))
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Number of bytes in the image.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData").field("len", &self.0.len()).finish()
    }
}

/// A registered user and the blob holding their profile image.
///
/// ## Invariants
/// - `image_key` names the blob `image_locator` resolves to.
/// - Serialises to the client projection `{id, name, email, imageLocator}`;
///   the blob key stays server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    id: UserId,
    name: UserName,
    email: Email,
    image_locator: ImageLocator,
    #[serde(skip)]
    image_key: BlobKey,
}

impl UserRecord {
    /// Build a record from validated components.
    pub fn new(
        id: UserId,
        name: UserName,
        email: Email,
        image_locator: ImageLocator,
        image_key: BlobKey,
    ) -> Self {
        Self {
            id,
            name,
            email,
            image_locator,
            image_key,
        }
    }

    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &UserName {
        &self.name
    }

    /// Unique email address.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Public locator of the profile image.
    pub fn image_locator(&self) -> &ImageLocator {
        &self.image_locator
    }

    /// Object-storage key of the profile image.
    pub fn image_key(&self) -> &BlobKey {
        &self.image_key
    }
}

/// Attribute names used in [`UserDocument`]s.
pub mod attributes {
    /// Record identifier.
    pub const ID: &str = "id";
    /// Display name.
    pub const NAME: &str = "name";
    /// Email address.
    pub const EMAIL: &str = "email";
    /// Public image locator.
    pub const IMAGE_LOCATOR: &str = "imageLocator";
    /// Object-storage key; absent on legacy documents.
    pub const IMAGE_KEY: &str = "imageKey";
}

/// Record attribute that can be matched by `find_by_field` lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Name,
    Email,
}

impl RecordField {
    /// Document attribute backing this field.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Name => attributes::NAME,
            Self::Email => attributes::EMAIL,
        }
    }
}

/// Flat attribute document as held by a record store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserDocument(BTreeMap<String, String>);

impl UserDocument {
    /// Build an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the document carries no attributes at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up one attribute.
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.0.get(attribute).map(String::as_str)
    }

    /// Set one attribute, returning the updated document.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(attribute.into(), value.into());
        self
    }

    /// Set one attribute in place.
    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<String>) {
        self.0.insert(attribute.into(), value.into());
    }

    /// Whether the given field holds exactly `value`.
    pub fn matches(&self, field: RecordField, value: &str) -> bool {
        self.get(field.attribute()) == Some(value)
    }

    /// Blob key of the stored image.
    ///
    /// Prefers the explicit `imageKey` attribute and falls back to the last
    /// segment of `imageLocator` for documents written without one.
    pub fn blob_key(&self) -> Result<BlobKey, UserValidationError> {
        match self.get(attributes::IMAGE_KEY) {
            Some(key) => BlobKey::new(key),
            None => {
                let locator = ImageLocator::new(self.require(attributes::IMAGE_LOCATOR)?)?;
                BlobKey::from_locator(&locator)
            }
        }
    }

    fn require(&self, attribute: &'static str) -> Result<&str, UserValidationError> {
        self.get(attribute)
            .ok_or(UserValidationError::MissingAttribute { attribute })
    }
}

impl From<&UserRecord> for UserDocument {
    fn from(record: &UserRecord) -> Self {
        Self::new()
            .with(attributes::ID, record.id.as_ref())
            .with(attributes::NAME, record.name.as_ref())
            .with(attributes::EMAIL, record.email.as_ref())
            .with(attributes::IMAGE_LOCATOR, record.image_locator.as_ref())
            .with(attributes::IMAGE_KEY, record.image_key.as_ref())
    }
}

impl TryFrom<&UserDocument> for UserRecord {
    type Error = UserValidationError;

    fn try_from(document: &UserDocument) -> Result<Self, Self::Error> {
        let id = UserId::new(document.require(attributes::ID)?)?;
        let name = UserName::new(document.require(attributes::NAME)?)?;
        let email = Email::new(document.require(attributes::EMAIL)?)?;
        let image_locator = ImageLocator::new(document.require(attributes::IMAGE_LOCATOR)?)?;
        let image_key = document.blob_key()?;
        Ok(Self::new(id, name, email, image_locator, image_key))
    }
}

//! Domain primitives, ports and services.
//!
//! Purpose: keep the user record lifecycle independent of transport and
//! storage. Inbound adapters call the driving ports in [`ports`]; outbound
//! adapters implement the driven ports.
//!
//! Public surface:
//! - [`Error`] and [`ErrorCode`]: transport agnostic error payload.
//! - [`UserRecord`]: a registered user and their image reference.
//! - [`UserLifecycleService`]: create, list, update and delete coordinator.
//! - [`OrphanReconciler`]: clean-up of blobs whose record never landed.

pub mod error;
pub mod identity_policy;
pub mod orphan_reconciler;
pub mod ports;
pub mod trace_id;
pub mod user;
pub mod user_lifecycle_service;

pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::identity_policy::IdentityPolicy;
pub use self::orphan_reconciler::{OrphanReconciler, ReconcileReport};
pub use self::trace_id::TraceId;
pub use self::user::{
    BlobKey, Email, IMAGE_CONTENT_TYPE, ImageData, ImageLocator, RecordField, UserDocument,
    UserId, UserName, UserRecord, UserValidationError, attributes,
};
pub use self::user_lifecycle_service::UserLifecycleService;

//! PostgreSQL persistence adapters using Diesel.
//!
//! Adapters translate between the internal row structs (`models.rs`,
//! `schema.rs`) and domain types; neither leaks past this module. Connections
//! come from a shared `bb8` pool through `diesel-async`, and every database
//! failure is mapped onto the owning port's error type.
//!
//! ```ignore
//! use profile_registry::outbound::persistence::{DbPool, DieselRecordStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/registry")).await?;
//! let records = DieselRecordStore::new(pool);
//! ```

mod diesel_record_store;
mod diesel_upload_intent_log;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_record_store::DieselRecordStore;
pub use diesel_upload_intent_log::DieselUploadIntentLog;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};

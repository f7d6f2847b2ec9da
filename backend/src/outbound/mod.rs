//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed record store and upload intent log
//!   using Diesel
//! - **storage**: filesystem and Cloud Storage blob stores
//! - **memory**: process-local adapters for development and tests
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod memory;
pub mod persistence;
pub mod storage;

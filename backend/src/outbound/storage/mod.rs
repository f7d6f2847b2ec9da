//! Durable blob store adapters.
//!
//! - **filesystem**: a local directory, suited to single-node deployments
//! - **gcs**: Google Cloud Storage over its JSON API

mod filesystem;
mod gcs;

pub use filesystem::FilesystemBlobStore;
pub use gcs::{DEFAULT_GCS_ENDPOINT, GcsBlobStore, GcsConfig, GcsSetupError};

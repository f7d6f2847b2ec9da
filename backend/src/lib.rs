//! Profile registry library: user records with profile images.
//!
//! The domain lives in [`domain`]; [`inbound`] exposes it over HTTP and
//! [`outbound`] holds the storage adapters. The binary wires them together
//! from [`settings`].

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;

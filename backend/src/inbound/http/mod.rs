//! HTTP inbound adapter exposing the REST endpoints.

pub mod error;
pub mod health;
pub mod image_payload;
pub mod images;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;

pub use error::ApiResult;

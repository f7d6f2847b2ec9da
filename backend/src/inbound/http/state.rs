//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and depend only on the driving
//! ports, so they can be exercised with mocks and no I/O.

use std::sync::Arc;

use crate::domain::ports::{UserLifecycleCommand, UserLifecycleQuery};

/// Default ceiling on a decoded profile image.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Mutating lifecycle operations.
    pub users: Arc<dyn UserLifecycleCommand>,
    /// Read-only lifecycle operations.
    pub users_query: Arc<dyn UserLifecycleQuery>,
    /// Largest decoded image accepted by create.
    pub max_image_bytes: usize,
}

impl HttpState {
    /// Bundle the lifecycle ports with the default image limit.
    pub fn new(
        users: Arc<dyn UserLifecycleCommand>,
        users_query: Arc<dyn UserLifecycleQuery>,
    ) -> Self {
        Self {
            users,
            users_query,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Override the decoded image size limit.
    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }
}

//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use profile_registry::inbound::http::state::HttpState;

/// Room left in a JSON body for everything besides the encoded image.
const JSON_ENVELOPE_BYTES: usize = 64 * 1024;

/// Largest JSON body accepted for a given decoded image ceiling.
///
/// Base64 inflates the image by four thirds; the envelope covers the other
/// fields and a `data:` URL prefix.
pub(crate) fn json_limit_for(max_image_bytes: usize) -> usize {
    max_image_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(JSON_ENVELOPE_BYTES)
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) http_state: HttpState,
}

impl ServerConfig {
    /// Construct a server configuration around the assembled handler state.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, http_state: HttpState) -> Self {
        Self {
            bind_addr,
            http_state,
        }
    }

    /// Return the JSON body limit derived from the image ceiling.
    #[must_use]
    pub fn json_limit(&self) -> usize {
        json_limit_for(self.http_state.max_image_bytes)
    }
}

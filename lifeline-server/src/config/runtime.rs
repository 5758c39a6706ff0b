//! Validated runtime configuration.

use lifeline_core::lifecycle::MatchingConfig;
use std::net::SocketAddr;

/// Configuration after loading, validation, and secret resolution.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Listen address for the HTTP server.
    pub listen: SocketAddr,
    /// Key bytes for bearer-token HMAC signing.
    pub token_key: Box<[u8]>,
    /// Proximity search radii.
    pub matching: MatchingConfig,
}

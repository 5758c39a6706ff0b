//! TOML file configuration structures.
//!
//! These structs directly map to the `lifeline-config.toml` file
//! format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub matching: MatchingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default address")
}

/// Auth configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSection {
    /// Token signing secret. Left empty, a random secret is generated
    /// on first start and the config file is rewritten.
    #[serde(default)]
    pub token_secret: String,
}

/// Matching radii, in meters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingSection {
    #[serde(default = "default_radius_m")]
    pub default_radius_m: f64,
    #[serde(default = "urgent_radius_m")]
    pub urgent_radius_m: f64,
}

impl Default for MatchingSection {
    fn default() -> Self {
        Self {
            default_radius_m: default_radius_m(),
            urgent_radius_m: urgent_radius_m(),
        }
    }
}

fn default_radius_m() -> f64 {
    10_000.0
}

fn urgent_radius_m() -> f64 {
    50_000.0
}

impl FileConfig {
    /// Whether a token secret has been configured (or generated on a
    /// previous start).
    pub fn has_token_secret(&self) -> bool {
        !self.auth.token_secret.trim().is_empty()
    }
}

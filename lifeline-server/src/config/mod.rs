//! Configuration module for lifeline-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments,
//! and environment variables. Also handles token secret generation.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::RuntimeConfig;
use lifeline_core::lifecycle::MatchingConfig;
use rand::RngCore;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the matching radii
    /// 4. Generate a token secret if none is configured (and rewrite
    ///    the file)
    pub fn load(&self) -> Result<RuntimeConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        self.validate(&file_config)?;

        let token_secret = if file_config.has_token_secret() {
            file_config.auth.token_secret.clone()
        } else {
            let secret = generate_token_secret();
            file_config.auth.token_secret = secret.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Token secret generated and config file updated");
            secret
        };

        Ok(RuntimeConfig {
            listen: file_config.server.listen,
            token_key: token_secret.into_bytes().into_boxed_slice(),
            matching: MatchingConfig {
                default_radius_m: file_config.matching.default_radius_m,
                urgent_radius_m: file_config.matching.urgent_radius_m,
            },
        })
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<RuntimeConfig, ConfigError> {
        self.load()
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.matching.default_radius_m <= 0.0 {
            return Err(ConfigError::ValidationError(
                "matching.default_radius_m must be positive".into(),
            ));
        }
        if config.matching.urgent_radius_m < config.matching.default_radius_m {
            return Err(ConfigError::ValidationError(
                "matching.urgent_radius_m must not be smaller than the default radius".into(),
            ));
        }
        Ok(())
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

/// 32 random bytes, base32-encoded so the secret survives a round trip
/// through the TOML file.
fn generate_token_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    fast32::base32::RFC4648_NOPAD.encode(&bytes)
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

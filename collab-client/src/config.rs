//! Configuration loading for collab-client.
//!
//! Configuration is loaded from a TOML file:
//!
//! ```toml
//! authority_address = "loopback"
//! poll_timeout_ms = 250
//!
//! [collab]
//! start_version = 0
//! client_id = 7
//! ```

use collab_core::CollabConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for a collab client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Address of the authority, passed to [`Transport::connect`](crate::Transport::connect).
    #[serde(default = "default_authority_address")]
    pub authority_address: String,
    /// How long `poll_timeout` waits for a message (default: 250ms).
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Session settings.
    #[serde(default)]
    pub collab: CollabConfig,
}

fn default_authority_address() -> String {
    "loopback".to_string()
}

fn default_poll_timeout_ms() -> u64 {
    250
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            authority_address: default_authority_address(),
            poll_timeout_ms: default_poll_timeout_ms(),
            collab: CollabConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Configuration for the authority at `address`.
    pub fn new(address: &str) -> Self {
        Self {
            authority_address: address.to_string(),
            ..Self::default()
        }
    }

    /// Use a fixed client id.
    pub fn with_client_id(mut self, client_id: u32) -> Self {
        self.collab = self.collab.with_client_id(client_id);
        self
    }

    /// Start from a known confirmed version.
    pub fn with_start_version(mut self, version: u64) -> Self {
        self.collab = self.collab.with_start_version(version);
        self
    }

    /// Set the poll timeout.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Poll timeout as a duration.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

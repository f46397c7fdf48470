//! Session configuration.
//!
//! A session starts from a confirmed version (0 for a fresh document) and a
//! client id. Both may be fixed by configuration; otherwise the id is drawn
//! at random once per session.

use collab_types::{ClientId, Version};
use serde::Deserialize;

/// Configuration for a collaborative editing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CollabConfig {
    /// Version of the document the session starts from (default: 0).
    pub start_version: u64,
    /// Fixed client id (default: random).
    pub client_id: Option<u32>,
}

impl CollabConfig {
    /// Start from the given version.
    pub fn with_start_version(mut self, version: u64) -> Self {
        self.start_version = version;
        self
    }

    /// Use a fixed client id instead of a random one.
    pub fn with_client_id(mut self, client_id: u32) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Validate and resolve into a starting version and client id.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured client id is zero.
    pub fn resolve(&self) -> Result<(Version, ClientId), ConfigError> {
        let client_id = match self.client_id {
            Some(raw) => ClientId::new(raw).ok_or(ConfigError::InvalidClientId(raw))?,
            None => ClientId::random(),
        };
        Ok((Version::new(self.start_version), client_id))
    }
}

/// Configuration error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Client ids must be positive.
    #[error("invalid client id {0}: must be a positive 32-bit integer")]
    InvalidClientId(u32),
}

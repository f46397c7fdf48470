//! Error types for the sync protocol handler.

use collab_types::{StepError, Version};
use thiserror::Error;

/// A batch that cannot be integrated.
///
/// Every variant is fatal to the sync attempt: continuing past any of them
/// risks permanent divergence, so the caller must discard local state and
/// refetch the authoritative document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// `steps` and `client_ids` differ in length.
    #[error("batch has {steps} steps but {client_ids} client ids")]
    LengthMismatch {
        /// Number of steps.
        steps: usize,
        /// Number of client ids.
        client_ids: usize,
    },

    /// The batch starts past our confirmed version; steps were missed.
    #[error("batch starts at version {received}, expected {expected}")]
    VersionGap {
        /// Our confirmed version.
        expected: Version,
        /// Version the batch extends.
        received: Version,
    },

    /// The batch starts before our confirmed version.
    #[error("stale batch from version {received}, already at {current}")]
    StaleVersion {
        /// Our confirmed version.
        current: Version,
        /// Version the batch extends.
        received: Version,
    },

    /// More of our own steps were echoed than we have pending.
    #[error("{echoed} steps echoed for this client but only {pending} pending")]
    UnknownEcho {
        /// Length of the echo prefix.
        echoed: usize,
        /// Pending queue length.
        pending: usize,
    },

    /// A remote step, or the inverse of a local one, does not apply.
    #[error("malformed step: {0}")]
    MalformedStep(#[from] StepError),
}

impl ProtocolError {
    /// True for batches older than our confirmed version.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleVersion { .. })
    }
}

//! Identity and ordering types for collab-sync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Identifies one editing session.
///
/// A positive 32-bit integer chosen once per session. It is only used to
/// recognize our own steps when the authority echoes them back, never as part
/// of document content.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(NonZeroU32);

impl ClientId {
    /// Create a ClientId from a raw value. Returns `None` for zero.
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    /// Create a new random ClientId.
    pub fn random() -> Self {
        loop {
            let mut bytes = [0u8; 4];
            getrandom::getrandom(&mut bytes).expect("getrandom failed");
            if let Some(id) = Self::new(u32::from_le_bytes(bytes)) {
                return id;
            }
        }
    }

    /// Get the numeric value of this ClientId.
    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.0)
    }
}

/// Number of steps in the authoritative total order.
///
/// Assigned by the authority, never by clients. A client's version only
/// moves forward when it integrates a batch.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Create a new Version with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this Version.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The version of an empty log.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Advance by `steps` confirmed steps.
    pub fn advance(&self, steps: usize) -> Self {
        Self(self.0.saturating_add(steps as u64))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self.0)
    }
}

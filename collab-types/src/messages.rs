//! Protocol messages for collab-sync.
//!
//! The sync core only defines the *shape* of what goes over the wire; the
//! transport decides how bytes move. [`Message::to_bytes`] and
//! [`Message::from_bytes`] give every transport the same MessagePack framing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{ClientId, CodecError, Step, Version};

/// All possible protocol messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize, S::Doc: Serialize",
    deserialize = "S: Deserialize<'de>, S::Doc: Deserialize<'de>"
))]
pub enum Message<S: Step> {
    /// Client submits its pending steps
    Submit(Submission<S>),
    /// Authority broadcasts newly ordered steps to every client
    Broadcast(Batch<S>),
    /// Authority refused a submission built on an outdated version
    Rejected {
        /// The authority's current version
        version: Version,
    },
    /// Client asks for a full document after a protocol error
    ResyncRequest {
        /// The client asking
        client_id: ClientId,
    },
    /// Authority answers a resync request
    Snapshot {
        /// Version of the document
        version: Version,
        /// The authoritative document
        doc: S::Doc,
    },
}

impl<S> Message<S>
where
    S: Step + Serialize + DeserializeOwned,
    S::Doc: Serialize + DeserializeOwned,
{
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        rmp_serde::to_vec_named(self).map_err(CodecError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    ///
    /// Only the framing is checked here. A broadcast whose `steps` and
    /// `client_ids` disagree still decodes, and is refused when integrated.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        rmp_serde::from_slice(bytes).map_err(CodecError::Deserialization)
    }
}

/// Pending steps a client sends to the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission<S> {
    /// Confirmed version the steps apply to
    pub version: Version,
    /// Steps in local application order, without inverses
    pub steps: Vec<S>,
    /// The submitting client
    pub client_id: ClientId,
}

/// Steps ordered by the authority, broadcast to every client.
///
/// `steps[i]` was produced by `client_ids[i]`. The batch extends the log
/// that ended at `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch<S> {
    /// Version the batch extends
    pub version: Version,
    /// Newly ordered steps
    pub steps: Vec<S>,
    /// Origin of each step
    pub client_ids: Vec<ClientId>,
}

impl<S> Batch<S> {
    /// Create a batch extending `version`.
    pub fn new(version: Version, steps: Vec<S>, client_ids: Vec<ClientId>) -> Self {
        Self {
            version,
            steps,
            client_ids,
        }
    }

    /// A batch where every step came from one client.
    pub fn from_client(version: Version, steps: Vec<S>, client_id: ClientId) -> Self {
        let client_ids = vec![client_id; steps.len()];
        Self::new(version, steps, client_ids)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if the batch carries no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Version after the batch is applied.
    pub fn end_version(&self) -> Version {
        self.version.advance(self.steps.len())
    }
}

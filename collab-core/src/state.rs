//! Collaborative session state machine for collab-sync.
//!
//! [`CollabState`] is an immutable snapshot of what one participant knows:
//! the confirmed version and the local steps the authority has not confirmed
//! yet. Every transition consumes the old snapshot and returns a new one.
//!
//! The actual I/O (submitting steps, receiving batches) is performed by
//! collab-client, not by this module. Old snapshots can be cloned and kept
//! around without affecting later transitions.

use collab_types::{Batch, ClientId, Step, Submission, Transform, Version};

use crate::config::{CollabConfig, ConfigError};
use crate::error::ProtocolError;
use crate::pending::{PendingQueue, Rebaseable};
use crate::rebase::{rebase_steps, rebaseable_steps_from};

/// Whether local steps are waiting for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Nothing pending; the document equals the confirmed version.
    Synced,
    /// Local steps await confirmation from the authority.
    Pending,
}

/// Session state - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollabState<S: Clone> {
    version: Version,
    unconfirmed: PendingQueue<S>,
}

impl<S: Step> CollabState<S> {
    /// Create a state at `version` with nothing pending.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            unconfirmed: PendingQueue::new(),
        }
    }

    /// Start a session from configuration.
    ///
    /// Returns the initial state and the session's client id.
    pub fn init(config: &CollabConfig) -> Result<(Self, ClientId), ConfigError> {
        let (version, client_id) = config.resolve()?;
        tracing::debug!(%version, %client_id, "collab session initialized");
        Ok((Self::new(version), client_id))
    }

    /// The confirmed version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Unconfirmed steps with their inverses, oldest first.
    pub fn unconfirmed(&self) -> &[Rebaseable<S>] {
        self.unconfirmed.as_slice()
    }

    /// Current phase of the session.
    pub fn phase(&self) -> SyncPhase {
        if self.unconfirmed.is_empty() {
            SyncPhase::Synced
        } else {
            SyncPhase::Pending
        }
    }

    /// True if nothing is waiting for confirmation.
    pub fn is_synced(&self) -> bool {
        self.phase() == SyncPhase::Synced
    }

    /// Record locally applied steps.
    ///
    /// Every step of `tr` is queued with its inverse, computed against the
    /// document it was applied to. The version does not change.
    pub fn on_local_edit(self, tr: &Transform<S>) -> Self {
        if tr.is_empty() {
            return self;
        }
        Self {
            version: self.version,
            unconfirmed: self.unconfirmed.extend(rebaseable_steps_from(tr, 0)),
        }
    }

    /// Steps to submit to the authority, or `None` if nothing is pending.
    ///
    /// Pure: calling this twice without a transition in between yields equal
    /// submissions. Tracking what is already in flight is up to the caller.
    pub fn sendable_steps(&self, client_id: ClientId) -> Option<Submission<S>> {
        if self.unconfirmed.is_empty() {
            return None;
        }
        Some(Submission {
            version: self.version,
            steps: self.unconfirmed.steps(),
            client_id,
        })
    }

    /// Integrate a batch from the authority.
    ///
    /// Checks that the batch extends our confirmed version, then behaves like
    /// [`receive_steps`](Self::receive_steps).
    pub fn receive(
        self,
        doc: &S::Doc,
        batch: &Batch<S>,
        local: ClientId,
    ) -> Result<SyncAction<S>, ProtocolError> {
        if batch.version < self.version {
            return Err(ProtocolError::StaleVersion {
                current: self.version,
                received: batch.version,
            });
        }
        if batch.version > self.version {
            return Err(ProtocolError::VersionGap {
                expected: self.version,
                received: batch.version,
            });
        }
        self.receive_steps(doc, &batch.steps, &batch.client_ids, local)
    }

    /// Integrate authoritative steps that directly follow our confirmed version.
    ///
    /// `doc` is the current local document, pending steps included. The
    /// leading run of steps from `local` confirms that many pending steps;
    /// the rest are remote edits, applied directly when nothing else is
    /// pending and rebased under the pending steps otherwise.
    ///
    /// Relies on the authority echoing a client's submission as a
    /// contiguous prefix of the batch following the version it was
    /// submitted at. This is not verified here.
    pub fn receive_steps(
        self,
        doc: &S::Doc,
        steps: &[S],
        client_ids: &[ClientId],
        local: ClientId,
    ) -> Result<SyncAction<S>, ProtocolError> {
        if steps.len() != client_ids.len() {
            return Err(ProtocolError::LengthMismatch {
                steps: steps.len(),
                client_ids: client_ids.len(),
            });
        }

        let ours = client_ids.iter().take_while(|&&id| id == local).count();
        if ours > self.unconfirmed.len() {
            return Err(ProtocolError::UnknownEcho {
                echoed: ours,
                pending: self.unconfirmed.len(),
            });
        }

        let version = self.version.advance(steps.len());
        let remaining = self.unconfirmed.drop_front(ours);
        let remote = &steps[ours..];

        if remote.is_empty() {
            tracing::debug!(%version, confirmed = ours, "batch confirmed local steps");
            return Ok(SyncAction::Confirm {
                state: Self {
                    version,
                    unconfirmed: remaining,
                },
                confirmed: ours,
            });
        }

        let rebased = remaining.len();
        let mut tr = Transform::new(doc.clone());
        let (unconfirmed, dropped) = if remaining.is_empty() {
            for step in remote {
                tr.step(step.clone())?;
            }
            (PendingQueue::new(), 0)
        } else {
            let outcome = rebase_steps(
                &mut tr,
                &remaining.steps(),
                &remaining.inverses(),
                remote,
            )?;
            let entries = rebaseable_steps_from(&tr, rebased + remote.len());
            (PendingQueue::from_entries(entries), outcome.dropped)
        };

        tracing::debug!(
            %version,
            confirmed = ours,
            remote = remote.len(),
            rebased,
            dropped,
            "batch applied remote steps"
        );

        Ok(SyncAction::Transform {
            state: Self {
                version,
                unconfirmed,
            },
            transform: tr,
            confirmed: ours,
            meta: SyncMeta::replay(rebased, dropped),
        })
    }
}

/// Annotations for a transform produced by synchronization.
///
/// Undo history and other interaction-aware collaborators read these to tell
/// a sync replay apart from something the user did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncMeta {
    /// Number of pending steps that were rebased.
    pub rebased: usize,
    /// Pending steps dropped by the rebase because their target was removed.
    pub dropped: usize,
    /// Whether this change came from user interaction. Always `false`.
    pub interactive: bool,
    /// Whether to record this change in undo history. Always `false`.
    pub add_to_history: bool,
}

impl SyncMeta {
    fn replay(rebased: usize, dropped: usize) -> Self {
        Self {
            rebased,
            dropped,
            interactive: false,
            add_to_history: false,
        }
    }
}

/// The outcome of integrating a batch.
#[derive(Debug, Clone)]
pub enum SyncAction<S: Step> {
    /// Only our own steps came back. The document is unchanged.
    Confirm {
        /// The next session state.
        state: CollabState<S>,
        /// Number of pending steps confirmed.
        confirmed: usize,
    },
    /// Remote steps were applied, directly or by rebasing pending steps.
    Transform {
        /// The next session state.
        state: CollabState<S>,
        /// Steps taking the current document to the new one.
        transform: Transform<S>,
        /// Number of pending steps confirmed before the remote ones.
        confirmed: usize,
        /// Sync annotations for the transform.
        meta: SyncMeta,
    },
}

impl<S: Step> SyncAction<S> {
    /// The next session state.
    pub fn state(&self) -> &CollabState<S> {
        match self {
            Self::Confirm { state, .. } | Self::Transform { state, .. } => state,
        }
    }

    /// Consume the action, keeping the next session state.
    pub fn into_state(self) -> CollabState<S> {
        match self {
            Self::Confirm { state, .. } | Self::Transform { state, .. } => state,
        }
    }

    /// Version after the batch.
    pub fn version(&self) -> Version {
        self.state().version()
    }

    /// Number of our own steps the batch confirmed.
    pub fn confirmed(&self) -> usize {
        match self {
            Self::Confirm { confirmed, .. } | Self::Transform { confirmed, .. } => *confirmed,
        }
    }
}

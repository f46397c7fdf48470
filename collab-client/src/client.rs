//! CollabClient - the main interface for collab-sync.
//!
//! This module provides [`CollabClient`], the API applications use to edit a
//! shared document and keep it synchronized with the authority.
//!
//! # Architecture
//!
//! CollabClient uses the pure session state from collab-core for protocol
//! logic and performs the actual I/O via the Transport trait.
//!
//! ```text
//! Application → CollabClient → Transport → Authority
//!                    ↓
//!               collab-core (pure state machine)
//! ```
//!
//! At most one submission is in flight at a time. It is settled either by
//! the broadcast that carries it back or by a `Rejected` reply, after which
//! the pending steps are resubmitted on the next [`flush`](CollabClient::flush)
//! once the client has caught up. Foreign broadcasts that overtake the
//! submission do not settle it: the authority answers every submission, so
//! the client keeps waiting for that answer.
//!
//! A [`ProtocolError`] while integrating a broadcast is never patched over:
//! the client drops its pending steps, asks the authority for a snapshot and
//! ignores broadcasts until the snapshot arrives.
//!
//! # Example
//!
//! ```ignore
//! use collab_client::{ClientConfig, CollabClient, LoopbackAuthority};
//! use collab_types::TextStep;
//!
//! let authority = LoopbackAuthority::<TextStep>::new(String::new());
//! let client = CollabClient::<TextStep, _>::new(ClientConfig::default(), String::new(), authority.transport())?;
//!
//! client.connect().await?;
//! client.edit(vec![TextStep::insert(0, "hello")]).await?;
//! client.flush().await?;
//! let event = client.poll().await?;
//! ```

use collab_core::{CollabState, ConfigError, ProtocolError, SyncAction};
use collab_types::{ClientId, CodecError, Message, Step, StepError, Transform, Version};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::transport::{Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A local step does not apply to the document.
    #[error("step error: {0}")]
    Step(#[from] StepError),

    /// Invalid session configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A broadcast could not be integrated.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Not connected to the authority.
    #[error("not connected")]
    NotConnected,

    /// Local edits are refused while waiting for a snapshot.
    #[error("resynchronizing with the authority")]
    Resyncing,

    /// The authority sent something a client never expects.
    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),
}

/// What a single [`CollabClient::poll`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A broadcast carried only our own steps back.
    Confirmed {
        /// Confirmed version after the batch.
        version: Version,
        /// Pending steps confirmed.
        confirmed: usize,
    },
    /// A broadcast carried remote steps, now applied to the document.
    Applied {
        /// Confirmed version after the batch.
        version: Version,
        /// Pending steps confirmed ahead of the remote ones.
        confirmed: usize,
        /// Remote steps applied.
        remote: usize,
        /// Pending steps lost to conflicting remote edits.
        dropped: usize,
    },
    /// The authority refused our submission; it is at `version`.
    Rejected {
        /// The authority's version.
        version: Version,
    },
    /// A broadcast failed to integrate and a snapshot was requested.
    ResyncRequested {
        /// Why the broadcast was refused.
        error: ProtocolError,
    },
    /// The snapshot arrived and replaced the local session.
    Resynced {
        /// Version of the snapshot.
        version: Version,
    },
    /// A broadcast arrived while waiting for a snapshot and was skipped.
    Ignored,
}

struct Session<S: Step> {
    state: CollabState<S>,
    doc: S::Doc,
    in_flight: Option<InFlight>,
    resyncing: bool,
}

/// A submission awaiting its echo or rejection.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    /// Version the submission was built on.
    base: Version,
    /// Confirmed version once all of it is echoed.
    end: Version,
}

impl InFlight {
    /// The authority only rejects submissions that miss its version, so a
    /// rejection reporting our base answers an older submission.
    fn answered_by_rejection(&self, authority: Version) -> bool {
        authority != self.base
    }
}

/// The main collaborative editing client.
///
/// Owns the local document and the session state, and drives both from
/// messages exchanged over the transport.
pub struct CollabClient<S: Step, T: Transport> {
    config: ClientConfig,
    transport: T,
    client_id: ClientId,
    session: Arc<Mutex<Session<S>>>,
}

impl<S, T> CollabClient<S, T>
where
    S: Step + Serialize + DeserializeOwned + Send + Sync,
    S::Doc: Serialize + DeserializeOwned + Send + Sync,
    T: Transport,
{
    /// Create a client for `doc`, which must be the authoritative document at
    /// the configured start version.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured client id is invalid.
    pub fn new(config: ClientConfig, doc: S::Doc, transport: T) -> Result<Self, ClientError> {
        let (state, client_id) = CollabState::init(&config.collab)?;
        Ok(Self {
            config,
            transport,
            client_id,
            session: Arc::new(Mutex::new(Session {
                state,
                doc,
                in_flight: None,
                resyncing: false,
            })),
        })
    }

    /// Connect to the authority.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.transport.connect(&self.config.authority_address).await?;
        tracing::debug!(
            client_id = %self.client_id,
            address = %self.config.authority_address,
            "connected to authority"
        );
        Ok(())
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Disconnect from the authority.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.transport.close().await?;
        Ok(())
    }

    /// Apply `steps` to the local document and queue them for submission.
    ///
    /// Either every step applies or nothing changes.
    pub async fn edit(&self, steps: Vec<S>) -> Result<(), ClientError> {
        let mut session = self.session.lock().await;
        if session.resyncing {
            return Err(ClientError::Resyncing);
        }

        let mut tr = Transform::new(session.doc.clone());
        for step in steps {
            tr.step(step)?;
        }
        if tr.is_empty() {
            return Ok(());
        }

        let state = session.state.clone().on_local_edit(&tr);
        session.state = state;
        session.doc = tr.into_doc();
        Ok(())
    }

    /// Submit pending steps unless a submission is already in flight.
    ///
    /// Returns `true` if a submission was sent.
    pub async fn flush(&self) -> Result<bool, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let mut session = self.session.lock().await;
        if session.resyncing || session.in_flight.is_some() {
            return Ok(false);
        }
        let Some(submission) = session.state.sendable_steps(self.client_id) else {
            return Ok(false);
        };

        let in_flight = InFlight {
            base: submission.version,
            end: submission.version.advance(submission.steps.len()),
        };
        tracing::debug!(
            client_id = %self.client_id,
            version = %submission.version,
            steps = submission.steps.len(),
            "submitting steps"
        );
        let bytes = Message::Submit(submission).to_bytes()?;
        self.transport.send(&bytes).await?;
        session.in_flight = Some(in_flight);
        Ok(true)
    }

    /// Receive one message from the authority and integrate it.
    pub async fn poll(&self) -> Result<ClientEvent, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let bytes = self.transport.recv().await?;
        let msg = Message::<S>::from_bytes(&bytes)?;
        self.handle(msg).await
    }

    /// Like [`poll`](Self::poll), but gives up after the configured poll
    /// timeout and returns `None` if nothing arrived.
    pub async fn poll_timeout(&self) -> Result<Option<ClientEvent>, ClientError> {
        self.poll_for(self.config.poll_timeout()).await
    }

    /// Like [`poll`](Self::poll), but gives up after `timeout`.
    pub async fn poll_for(&self, timeout: Duration) -> Result<Option<ClientEvent>, ClientError> {
        match tokio::time::timeout(timeout, self.poll()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    async fn handle(&self, msg: Message<S>) -> Result<ClientEvent, ClientError> {
        let mut session = self.session.lock().await;

        match msg {
            Message::Broadcast(batch) => {
                if session.resyncing {
                    tracing::debug!(version = %batch.version, "skipping broadcast during resync");
                    return Ok(ClientEvent::Ignored);
                }

                let received = batch.len();
                let end = batch.end_version();
                let result = session
                    .state
                    .clone()
                    .receive(&session.doc, &batch, self.client_id);
                let action = match result {
                    Ok(action) => action,
                    Err(error) => return self.request_resync(&mut session, error).await,
                };

                let echoed = action.confirmed() > 0;
                let event = match action {
                    SyncAction::Confirm { state, confirmed } => {
                        session.state = state;
                        ClientEvent::Confirmed {
                            version: session.state.version(),
                            confirmed,
                        }
                    }
                    SyncAction::Transform {
                        state,
                        transform,
                        confirmed,
                        meta,
                    } => {
                        if meta.dropped > 0 {
                            tracing::info!(
                                dropped = meta.dropped,
                                "local steps dropped by conflicting remote edits"
                            );
                        }
                        session.state = state;
                        session.doc = transform.into_doc();
                        ClientEvent::Applied {
                            version: session.state.version(),
                            confirmed,
                            remote: received - confirmed,
                            dropped: meta.dropped,
                        }
                    }
                };

                if matches!(session.in_flight, Some(sent) if echoed && end >= sent.end) {
                    session.in_flight = None;
                }
                Ok(event)
            }
            Message::Rejected { version } => {
                tracing::debug!(
                    client_id = %self.client_id,
                    authority = %version,
                    local = %session.state.version(),
                    "submission rejected"
                );
                let in_flight = session.in_flight;
                match in_flight {
                    Some(sent) if sent.answered_by_rejection(version) => {
                        session.in_flight = None;
                    }
                    Some(_) => tracing::debug!(%version, "ignoring rejection of an older submission"),
                    None => {}
                }
                Ok(ClientEvent::Rejected { version })
            }
            Message::Snapshot { version, doc } => {
                if !session.resyncing {
                    return Err(ClientError::UnexpectedMessage(
                        "snapshot without a resync request".into(),
                    ));
                }
                tracing::info!(client_id = %self.client_id, %version, "resynchronized from snapshot");
                session.state = CollabState::new(version);
                session.doc = doc;
                session.in_flight = None;
                session.resyncing = false;
                Ok(ClientEvent::Resynced { version })
            }
            Message::Submit(_) | Message::ResyncRequest { .. } => Err(
                ClientError::UnexpectedMessage("client-bound message type".into()),
            ),
        }
    }

    async fn request_resync(
        &self,
        session: &mut Session<S>,
        error: ProtocolError,
    ) -> Result<ClientEvent, ClientError> {
        tracing::warn!(
            client_id = %self.client_id,
            %error,
            discarded = session.state.unconfirmed().len(),
            "protocol error, discarding local state"
        );
        session.state = CollabState::new(session.state.version());
        session.in_flight = None;
        session.resyncing = true;

        let request = Message::<S>::ResyncRequest {
            client_id: self.client_id,
        };
        self.transport.send(&request.to_bytes()?).await?;
        Ok(ClientEvent::ResyncRequested { error })
    }

    /// This session's client id.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// The local document, pending steps included.
    pub async fn doc(&self) -> S::Doc {
        self.session.lock().await.doc.clone()
    }

    /// The confirmed version.
    pub async fn version(&self) -> Version {
        self.session.lock().await.state.version()
    }

    /// True if no local steps await confirmation.
    pub async fn is_synced(&self) -> bool {
        self.session.lock().await.state.is_synced()
    }

    /// Number of local steps awaiting confirmation.
    pub async fn pending(&self) -> usize {
        self.session.lock().await.state.unconfirmed().len()
    }

    /// True while a submission awaits its broadcast or rejection.
    pub async fn has_in_flight(&self) -> bool {
        self.session.lock().await.in_flight.is_some()
    }

    /// True while waiting for a snapshot.
    pub async fn is_resyncing(&self) -> bool {
        self.session.lock().await.resyncing
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use collab_types::{Batch, Submission, TextStep};

    fn id(n: u32) -> ClientId {
        ClientId::new(n).unwrap()
    }

    fn test_config() -> ClientConfig {
        ClientConfig::new("test-authority").with_client_id(1)
    }

    async fn connected(doc: &str) -> (CollabClient<TextStep, MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let client =
            CollabClient::<TextStep, _>::new(test_config(), doc.to_string(), transport.clone())
                .unwrap();
        client.connect().await.unwrap();
        (client, transport)
    }

    fn broadcast(version: u64, steps: Vec<TextStep>, ids: &[u32]) -> Message<TextStep> {
        Message::Broadcast(Batch::new(
            Version::new(version),
            steps,
            ids.iter().map(|&n| id(n)).collect(),
        ))
    }

    fn submissions(transport: &MockTransport) -> Vec<Submission<TextStep>> {
        transport
            .sent_messages::<TextStep>()
            .unwrap()
            .into_iter()
            .filter_map(|msg| match msg {
                Message::Submit(sub) => Some(sub),
                _ => None,
            })
            .collect()
    }

    // ===========================================
    // Construction & Connection
    // ===========================================

    #[test]
    fn zero_client_id_is_rejected() {
        let result = CollabClient::<TextStep, _>::new(
            ClientConfig::default().with_client_id(0),
            String::new(),
            MockTransport::new(),
        );
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn connect_uses_configured_address() {
        let (client, transport) = connected("").await;

        assert!(client.is_connected());
        assert_eq!(transport.connected_address().as_deref(), Some("test-authority"));
        assert_eq!(client.client_id(), id(1));
    }

    #[tokio::test]
    async fn connect_failure_returns_error() {
        let transport = MockTransport::new();
        transport.fail_next_connect("unreachable");
        let client = CollabClient::<TextStep, _>::new(test_config(), String::new(), transport)
            .unwrap();

        let result = client.connect().await;
        assert!(matches!(
            result,
            Err(ClientError::Transport(TransportError::ConnectionFailed(_)))
        ));
    }

    #[tokio::test]
    async fn flush_without_connect_fails() {
        let client =
            CollabClient::<TextStep, _>::new(test_config(), String::new(), MockTransport::new())
                .unwrap();
        assert!(matches!(client.flush().await, Err(ClientError::NotConnected)));
        assert!(matches!(client.poll().await, Err(ClientError::NotConnected)));
    }

    // ===========================================
    // Local edits & submission
    // ===========================================

    #[tokio::test]
    async fn edit_applies_locally_and_queues() {
        let (client, _) = connected("hello").await;

        client.edit(vec![TextStep::insert(5, "!")]).await.unwrap();

        assert_eq!(client.doc().await, "hello!");
        assert_eq!(client.pending().await, 1);
        assert!(!client.is_synced().await);
        assert_eq!(client.version().await, Version::zero());
    }

    #[tokio::test]
    async fn failed_edit_changes_nothing() {
        let (client, _) = connected("ab").await;

        let result = client
            .edit(vec![TextStep::insert(0, "x"), TextStep::delete(0, 10)])
            .await;

        assert!(matches!(result, Err(ClientError::Step(_))));
        assert_eq!(client.doc().await, "ab");
        assert!(client.is_synced().await);
    }

    #[tokio::test]
    async fn only_one_submission_in_flight() {
        let (client, transport) = connected("").await;

        client.edit(vec![TextStep::insert(0, "a")]).await.unwrap();
        assert!(client.flush().await.unwrap());
        client.edit(vec![TextStep::insert(1, "b")]).await.unwrap();
        assert!(!client.flush().await.unwrap());

        let subs = submissions(&transport);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].version, Version::zero());
        assert_eq!(subs[0].steps, vec![TextStep::insert(0, "a")]);
        assert!(client.has_in_flight().await);
    }

    #[tokio::test]
    async fn disconnect_closes_transport() {
        let (client, _) = connected("").await;
        client.edit(vec![TextStep::insert(0, "a")]).await.unwrap();

        client.disconnect().await.unwrap();

        assert!(!client.is_connected());
        assert!(matches!(client.flush().await, Err(ClientError::NotConnected)));
        assert_eq!(client.pending().await, 1);
    }

    #[tokio::test]
    async fn flush_with_nothing_pending_sends_nothing() {
        let (client, transport) = connected("").await;
        assert!(!client.flush().await.unwrap());
        assert!(transport.sent_frames().is_empty());
    }

    #[tokio::test]
    async fn failed_send_leaves_nothing_in_flight() {
        let (client, transport) = connected("").await;
        client.edit(vec![TextStep::insert(0, "a")]).await.unwrap();
        transport.fail_next_send("buffer full");

        assert!(client.flush().await.is_err());
        assert!(!client.has_in_flight().await);
        assert!(client.flush().await.unwrap());
    }

    // ===========================================
    // Integrating broadcasts
    // ===========================================

    #[tokio::test]
    async fn echo_confirms_and_releases_in_flight() {
        let (client, transport) = connected("").await;
        client.edit(vec![TextStep::insert(0, "a")]).await.unwrap();
        client.flush().await.unwrap();
        client.edit(vec![TextStep::insert(1, "b")]).await.unwrap();

        transport
            .queue_message(&broadcast(0, vec![TextStep::insert(0, "a")], &[1]))
            .unwrap();
        let event = client.poll().await.unwrap();

        assert_eq!(
            event,
            ClientEvent::Confirmed {
                version: Version::new(1),
                confirmed: 1
            }
        );
        assert!(!client.has_in_flight().await);
        assert_eq!(client.pending().await, 1);

        assert!(client.flush().await.unwrap());
        let subs = submissions(&transport);
        assert_eq!(subs[1].version, Version::new(1));
        assert_eq!(subs[1].steps, vec![TextStep::insert(1, "b")]);
    }

    #[tokio::test]
    async fn remote_steps_are_rebased_under_pending() {
        let (client, transport) = connected("hello").await;
        client.edit(vec![TextStep::insert(5, "!")]).await.unwrap();

        transport
            .queue_message(&broadcast(0, vec![TextStep::insert(0, ">> ")], &[2]))
            .unwrap();
        let event = client.poll().await.unwrap();

        assert_eq!(
            event,
            ClientEvent::Applied {
                version: Version::new(1),
                confirmed: 0,
                remote: 1,
                dropped: 0
            }
        );
        assert_eq!(client.doc().await, ">> hello!");
        assert_eq!(client.pending().await, 1);
    }

    #[tokio::test]
    async fn rejection_clears_in_flight_for_resubmission() {
        let (client, transport) = connected("").await;
        client.edit(vec![TextStep::insert(0, "a")]).await.unwrap();
        client.flush().await.unwrap();

        transport
            .queue_message(&Message::<TextStep>::Rejected {
                version: Version::new(1),
            })
            .unwrap();
        transport
            .queue_message(&broadcast(0, vec![TextStep::insert(0, "z")], &[2]))
            .unwrap();

        assert_eq!(
            client.poll().await.unwrap(),
            ClientEvent::Rejected {
                version: Version::new(1)
            }
        );
        assert!(!client.has_in_flight().await);
        client.poll().await.unwrap();

        assert!(client.flush().await.unwrap());
        let subs = submissions(&transport);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[1].version, Version::new(1));
        // Concurrent inserts at the same spot: the confirmed one stays first.
        assert_eq!(client.doc().await, "za");
    }

    #[tokio::test]
    async fn foreign_batch_does_not_settle_in_flight() {
        let (client, transport) = connected("").await;
        client.edit(vec![TextStep::insert(0, "a")]).await.unwrap();
        assert!(client.flush().await.unwrap());

        // Someone else took version 0 first; our submission is still unanswered.
        transport
            .queue_message(&broadcast(0, vec![TextStep::insert(0, "z")], &[2]))
            .unwrap();
        client.poll().await.unwrap();

        assert_eq!(client.version().await, Version::new(1));
        assert!(client.has_in_flight().await);
        assert!(!client.flush().await.unwrap());
        assert_eq!(submissions(&transport).len(), 1);

        transport
            .queue_message(&Message::<TextStep>::Rejected {
                version: Version::new(1),
            })
            .unwrap();
        client.poll().await.unwrap();

        assert!(!client.has_in_flight().await);
        assert!(client.flush().await.unwrap());
        let subs = submissions(&transport);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[1].version, Version::new(1));
    }

    #[tokio::test]
    async fn rejection_of_an_older_submission_is_ignored() {
        let (client, transport) = connected("").await;
        transport
            .queue_message(&broadcast(0, vec![TextStep::insert(0, "z")], &[2]))
            .unwrap();
        client.poll().await.unwrap();

        client.edit(vec![TextStep::insert(1, "a")]).await.unwrap();
        assert!(client.flush().await.unwrap());

        // The authority never rejects a submission built on its own version.
        transport
            .queue_message(&Message::<TextStep>::Rejected {
                version: Version::new(1),
            })
            .unwrap();
        assert_eq!(
            client.poll().await.unwrap(),
            ClientEvent::Rejected {
                version: Version::new(1)
            }
        );
        assert!(client.has_in_flight().await);
        assert!(!client.flush().await.unwrap());
    }

    #[tokio::test]
    async fn echo_split_across_batches_settles_on_the_last_part() {
        let (client, transport) = connected("").await;
        client
            .edit(vec![TextStep::insert(0, "a"), TextStep::insert(1, "b")])
            .await
            .unwrap();
        assert!(client.flush().await.unwrap());

        transport
            .queue_message(&broadcast(0, vec![TextStep::insert(0, "a")], &[1]))
            .unwrap();
        transport
            .queue_message(&broadcast(1, vec![TextStep::insert(1, "b")], &[1]))
            .unwrap();

        client.poll().await.unwrap();
        assert!(client.has_in_flight().await);
        client.poll().await.unwrap();
        assert!(!client.has_in_flight().await);
        assert!(client.is_synced().await);
        assert_eq!(client.doc().await, "ab");
    }

    // ===========================================
    // Resync
    // ===========================================

    #[tokio::test]
    async fn mismatched_broadcast_triggers_resync() {
        let (client, transport) = connected("abc").await;
        client.edit(vec![TextStep::insert(3, "!")]).await.unwrap();
        client.flush().await.unwrap();

        transport
            .queue_message(&broadcast(
                0,
                vec![TextStep::insert(0, "x"), TextStep::insert(0, "y")],
                &[2],
            ))
            .unwrap();
        let event = client.poll().await.unwrap();

        assert_eq!(
            event,
            ClientEvent::ResyncRequested {
                error: ProtocolError::LengthMismatch {
                    steps: 2,
                    client_ids: 1
                }
            }
        );
        assert!(client.is_resyncing().await);
        assert_eq!(client.pending().await, 0);
        assert!(!client.has_in_flight().await);
        assert!(matches!(
            transport.sent_messages::<TextStep>().unwrap().last(),
            Some(Message::ResyncRequest { client_id }) if *client_id == id(1)
        ));
    }

    #[tokio::test]
    async fn version_gap_triggers_resync() {
        let (client, transport) = connected("abc").await;
        client.edit(vec![TextStep::insert(0, "x")]).await.unwrap();

        transport
            .queue_message(&broadcast(4, vec![TextStep::insert(0, "q")], &[2]))
            .unwrap();
        transport
            .queue_message(&broadcast(5, vec![TextStep::insert(0, "r")], &[2]))
            .unwrap();
        transport
            .queue_message(&Message::<TextStep>::Snapshot {
                version: Version::new(6),
                doc: "rqabc".to_string(),
            })
            .unwrap();

        let event = client.poll().await.unwrap();
        assert!(matches!(
            event,
            ClientEvent::ResyncRequested {
                error: ProtocolError::VersionGap { .. }
            }
        ));
        assert!(client.is_resyncing().await);
        assert!(matches!(
            transport.sent_messages::<TextStep>().unwrap().last(),
            Some(Message::ResyncRequest { client_id }) if *client_id == id(1)
        ));
        assert!(matches!(
            client.edit(vec![TextStep::insert(0, "y")]).await,
            Err(ClientError::Resyncing)
        ));

        assert_eq!(client.poll().await.unwrap(), ClientEvent::Ignored);
        assert_eq!(
            client.poll().await.unwrap(),
            ClientEvent::Resynced {
                version: Version::new(6)
            }
        );
        assert!(!client.is_resyncing().await);
        assert_eq!(client.doc().await, "rqabc");
        assert_eq!(client.version().await, Version::new(6));
        assert!(client.is_synced().await);
    }

    #[tokio::test]
    async fn unsolicited_snapshot_is_unexpected() {
        let (client, transport) = connected("").await;
        transport
            .queue_message(&Message::<TextStep>::Snapshot {
                version: Version::new(3),
                doc: "zzz".to_string(),
            })
            .unwrap();

        assert!(matches!(
            client.poll().await,
            Err(ClientError::UnexpectedMessage(_))
        ));
        assert_eq!(client.doc().await, "");
    }

    #[tokio::test]
    async fn poll_for_times_out_quietly() {
        // Never-resolving recv: a transport that is connected but starved.
        let authority = crate::transport::LoopbackAuthority::<TextStep>::new(String::new());
        let client =
            CollabClient::<TextStep, _>::new(test_config(), String::new(), authority.transport())
                .unwrap();
        client.connect().await.unwrap();

        let event = client.poll_for(Duration::from_millis(10)).await.unwrap();
        assert!(event.is_none());
    }
}

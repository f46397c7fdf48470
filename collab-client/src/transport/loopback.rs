//! In-process authority and the transport that talks to it.
//!
//! [`LoopbackAuthority`] is a reference sequencer for tests and demos. It
//! keeps the authoritative step log and document behind a mutex and answers
//! every frame synchronously from inside `send()`:
//!
//! - `Submit` at the current log length is appended and broadcast to every
//!   connected client, the submitter included
//! - `Submit` at any other version gets `Rejected` with the current version
//! - `ResyncRequest` gets a `Snapshot` of the current document
//!
//! Frames to each client go through an unbounded channel, so each client
//! sees messages in exactly the order the authority produced them.

use super::{Transport, TransportError};
use async_trait::async_trait;
use collab_types::{Batch, ClientId, Message, Step, Version};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

type Outbox = mpsc::UnboundedSender<Vec<u8>>;
type Inbox = mpsc::UnboundedReceiver<Vec<u8>>;

/// Reference authority shared by any number of [`LoopbackTransport`]s.
#[derive(Debug)]
pub struct LoopbackAuthority<S: Step> {
    inner: Arc<Mutex<AuthorityInner<S>>>,
}

#[derive(Debug)]
struct AuthorityInner<S: Step> {
    doc: S::Doc,
    steps: Vec<S>,
    client_ids: Vec<ClientId>,
    peers: HashMap<u64, Outbox>,
    next_peer: u64,
}

impl<S: Step> Clone for LoopbackAuthority<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> LoopbackAuthority<S>
where
    S: Step + Serialize + DeserializeOwned,
    S::Doc: Serialize + DeserializeOwned,
{
    /// Create an authority holding `doc` at version 0.
    pub fn new(doc: S::Doc) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuthorityInner {
                doc,
                steps: Vec::new(),
                client_ids: Vec::new(),
                peers: HashMap::new(),
                next_peer: 0,
            })),
        }
    }

    /// A disconnected transport bound to this authority.
    pub fn transport(&self) -> LoopbackTransport<S> {
        LoopbackTransport {
            authority: self.clone(),
            peer: Mutex::new(None),
            inbox: tokio::sync::Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Current authoritative version (the log length).
    pub fn version(&self) -> Version {
        Version::new(self.lock().steps.len() as u64)
    }

    /// Current authoritative document.
    pub fn doc(&self) -> S::Doc {
        self.lock().doc.clone()
    }

    /// Ordered steps and their origins since `version`.
    pub fn steps_since(&self, version: Version) -> Batch<S> {
        let inner = self.lock();
        let start = (version.value() as usize).min(inner.steps.len());
        Batch::new(
            version,
            inner.steps[start..].to_vec(),
            inner.client_ids[start..].to_vec(),
        )
    }

    /// Number of connected clients.
    pub fn peer_count(&self) -> usize {
        self.lock().peers.len()
    }

    fn lock(&self) -> MutexGuard<'_, AuthorityInner<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self) -> (u64, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let peer = inner.next_peer;
        inner.next_peer += 1;
        inner.peers.insert(peer, tx);
        tracing::debug!(peer, "loopback client connected");
        (peer, rx)
    }

    fn unregister(&self, peer: u64) {
        if self.lock().peers.remove(&peer).is_some() {
            tracing::debug!(peer, "loopback client disconnected");
        }
    }

    fn handle(&self, peer: u64, frame: &[u8]) -> Result<(), TransportError> {
        let msg = Message::<S>::from_bytes(frame)
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        let mut inner = self.lock();

        match msg {
            Message::Submit(sub) => {
                let current = Version::new(inner.steps.len() as u64);
                if sub.version != current {
                    tracing::debug!(
                        client_id = %sub.client_id,
                        submitted = %sub.version,
                        %current,
                        "rejecting stale submission"
                    );
                    return inner.reply(peer, &Message::<S>::Rejected { version: current });
                }

                // Apply to a scratch copy so a bad step leaves the log untouched.
                let mut doc = inner.doc.clone();
                for step in &sub.steps {
                    doc = step
                        .apply(&doc)
                        .map_err(|e| TransportError::SendFailed(e.to_string()))?;
                }
                inner.doc = doc;
                inner.client_ids.extend(std::iter::repeat(sub.client_id).take(sub.steps.len()));
                inner.steps.extend(sub.steps.iter().cloned());

                let batch = Batch::from_client(current, sub.steps, sub.client_id);
                tracing::debug!(
                    client_id = %sub.client_id,
                    from = %current,
                    to = %batch.end_version(),
                    "accepted submission"
                );
                inner.broadcast(&Message::Broadcast(batch))
            }
            Message::ResyncRequest { client_id } => {
                let version = Version::new(inner.steps.len() as u64);
                tracing::info!(%client_id, %version, "sending snapshot");
                let snapshot = Message::<S>::Snapshot {
                    version,
                    doc: inner.doc.clone(),
                };
                inner.reply(peer, &snapshot)
            }
            other => Err(TransportError::SendFailed(format!(
                "authority does not accept {:?}",
                other
            ))),
        }
    }
}

impl<S> AuthorityInner<S>
where
    S: Step + Serialize + DeserializeOwned,
    S::Doc: Serialize + DeserializeOwned,
{
    fn reply(&mut self, peer: u64, msg: &Message<S>) -> Result<(), TransportError> {
        let frame = msg
            .to_bytes()
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        let delivered = self
            .peers
            .get(&peer)
            .is_some_and(|tx| tx.send(frame).is_ok());
        if !delivered {
            self.peers.remove(&peer);
            return Err(TransportError::ConnectionClosed);
        }
        Ok(())
    }

    fn broadcast(&mut self, msg: &Message<S>) -> Result<(), TransportError> {
        let frame = msg
            .to_bytes()
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        // Receivers that went away without closing are pruned here.
        self.peers.retain(|_, tx| tx.send(frame.clone()).is_ok());
        Ok(())
    }
}

/// Transport connected to a [`LoopbackAuthority`] in the same process.
#[derive(Debug)]
pub struct LoopbackTransport<S: Step> {
    authority: LoopbackAuthority<S>,
    peer: Mutex<Option<u64>>,
    inbox: tokio::sync::Mutex<Option<Inbox>>,
    connected: AtomicBool,
}

impl<S: Step> LoopbackTransport<S> {
    fn peer(&self) -> Option<u64> {
        *self.peer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<S> Transport for LoopbackTransport<S>
where
    S: Step + Serialize + DeserializeOwned + Send + Sync,
    S::Doc: Serialize + DeserializeOwned + Send + Sync,
{
    async fn connect(&self, _address: &str) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        let (peer, rx) = self.authority.register();
        *self.peer.lock().unwrap_or_else(PoisonError::into_inner) = Some(peer);
        *self.inbox.lock().await = Some(rx);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let peer = self.peer().ok_or(TransportError::NotConnected)?;
        self.authority.handle(peer, data)
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut inbox = self.inbox.lock().await;
        let rx = inbox.as_mut().ok_or(TransportError::NotConnected)?;
        rx.recv().await.ok_or(TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let peer = self
            .peer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(peer) = peer {
            self.authority.unregister(peer);
        }
        *self.inbox.lock().await = None;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

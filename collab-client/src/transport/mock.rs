//! Scripted transport for testing.
//!
//! Inbound frames are queued up front; outbound frames are captured so
//! tests can decode and inspect what the client submitted.

use super::{Transport, TransportError};
use async_trait::async_trait;
use collab_types::{CodecError, Message, Step};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock transport for testing.
///
/// Clones share the same state, so a test can keep one handle while the
/// client owns another.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug, Default)]
struct MockInner {
    connected: bool,
    address: Option<String>,
    sent: Vec<Vec<u8>>,
    inbound: VecDeque<Vec<u8>>,
    fail_connect: Option<String>,
    fail_send: Option<String>,
    fail_recv: Option<String>,
}

impl MockTransport {
    /// Create a disconnected mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw frame for a later `recv()`.
    pub fn queue_frame(&self, data: Vec<u8>) {
        self.inner.lock().unwrap().inbound.push_back(data);
    }

    /// Encode `msg` and queue it for a later `recv()`.
    pub fn queue_message<S>(&self, msg: &Message<S>) -> Result<(), CodecError>
    where
        S: Step + Serialize + DeserializeOwned,
        S::Doc: Serialize + DeserializeOwned,
    {
        self.queue_frame(msg.to_bytes()?);
        Ok(())
    }

    /// Number of frames still waiting to be received.
    pub fn pending_inbound(&self) -> usize {
        self.inner.lock().unwrap().inbound.len()
    }

    /// Raw frames sent so far.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Decode every frame sent so far.
    pub fn sent_messages<S>(&self) -> Result<Vec<Message<S>>, CodecError>
    where
        S: Step + Serialize + DeserializeOwned,
        S::Doc: Serialize + DeserializeOwned,
    {
        self.sent_frames()
            .iter()
            .map(|frame| Message::from_bytes(frame))
            .collect()
    }

    /// Address passed to the last successful `connect()`.
    pub fn connected_address(&self) -> Option<String> {
        self.inner.lock().unwrap().address.clone()
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.inner.lock().unwrap().fail_connect = Some(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.inner.lock().unwrap().fail_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        self.inner.lock().unwrap().fail_recv = Some(error.to_string());
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }
        inner.connected = true;
        inner.address = Some(address.to_string());
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = inner.fail_send.take() {
            return Err(TransportError::SendFailed(error));
        }
        inner.sent.push(data.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = inner.fail_recv.take() {
            return Err(TransportError::ReceiveFailed(error));
        }
        // An exhausted script behaves like the authority hanging up.
        inner
            .inbound
            .pop_front()
            .ok_or(TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner.lock().unwrap().connected = false;
        Ok(())
    }
}

//! Transport abstraction for collab-sync.
//!
//! This module provides a pluggable transport layer that abstracts how
//! encoded messages reach the authority (in-process loopback, mock for
//! testing, or a real network connection supplied by the application).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` establishes a connection
//! - `send()` transmits one encoded [`Message`](collab_types::Message)
//! - `recv()` waits for the next encoded message
//! - `close()` gracefully terminates
//!
//! Transports move opaque frames. They never inspect or reorder them; the
//! client relies on frames from the authority arriving in the order they
//! were sent.

mod loopback;
mod mock;

pub use loopback::{LoopbackAuthority, LoopbackTransport};
pub use mock::MockTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Transport trait for exchanging protocol frames with the authority.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the authority identified by `address`.
    ///
    /// The meaning of the address is up to the implementation.
    async fn connect(&self, address: &str) -> Result<(), TransportError>;

    /// Send one encoded message.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receive one encoded message.
    ///
    /// Blocks until a frame is available or the connection closes.
    async fn recv(&self) -> Result<Vec<u8>, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}

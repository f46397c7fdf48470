//! # collab-client
//!
//! Async integration layer for collab-sync.
//!
//! Wraps the pure session state from `collab-core` with a local document,
//! a pluggable transport and the submission discipline the protocol needs.
//!
//! ## Features
//!
//! - **One batch in flight**: pending steps are submitted again only after
//!   the previous submission was confirmed or rejected
//! - **Hard resync**: a broadcast that cannot be integrated discards local
//!   state and reloads the authoritative snapshot
//! - **Transport Abstraction**: pluggable transport layer (loopback, mock)
//! - **Reference authority**: [`LoopbackAuthority`] sequences submissions
//!   in-process for tests and demos
//!
//! ## Example
//!
//! ```ignore
//! use collab_client::{ClientConfig, CollabClient, LoopbackAuthority};
//! use collab_types::TextStep;
//!
//! let authority = LoopbackAuthority::<TextStep>::new("hello".to_string());
//! let client = CollabClient::<TextStep, _>::new(ClientConfig::default(), "hello".to_string(), authority.transport())?;
//! client.connect().await?;
//!
//! client.edit(vec![TextStep::insert(5, "!")]).await?;
//! client.flush().await?;
//! while let Some(event) = client.poll_timeout().await? {
//!     println!("{event:?}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod transport;

pub use client::{ClientError, ClientEvent, CollabClient};
pub use config::{ClientConfig, ConfigError};
pub use transport::{LoopbackAuthority, LoopbackTransport, MockTransport, Transport, TransportError};

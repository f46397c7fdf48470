//! # collab-core
//!
//! Pure sync logic for collab-sync (no I/O, instant tests).
//!
//! This crate implements the client-side state machine of collaborative
//! editing against a central authority: it tracks the confirmed version,
//! queues local steps until the authority confirms them, and rebases those
//! steps when remote steps arrive first.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (submitting steps, receiving batches) is performed by
//! `collab-client`, which interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod pending;
pub mod rebase;
pub mod state;

pub use config::{CollabConfig, ConfigError};
pub use error::ProtocolError;
pub use pending::{PendingQueue, Rebaseable};
pub use rebase::{rebase_steps, rebaseable_steps_from, RebaseOutcome};
pub use state::{CollabState, SyncAction, SyncMeta, SyncPhase};

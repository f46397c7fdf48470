//! # collab-types
//!
//! Step model and wire format types for collab-sync.
//!
//! This crate provides the foundational types used across all collab-sync crates:
//! - [`ClientId`], [`Version`] - Session identity and ordering types
//! - [`Step`], [`StepMap`], [`Mapping`], [`Transform`] - The step contract the
//!   sync core is written against
//! - [`TextStep`] - A plain-text reference implementation of that contract
//! - [`Message`], [`Submission`], [`Batch`] - Protocol messages
//! - [`CodecError`], [`StepError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod map;
mod messages;
mod step;
mod text;
mod transform;

pub use error::CodecError;
pub use ids::{ClientId, Version};
pub use map::{Assoc, MapRange, MapResult, Mapping, MappingSlice, Recover, StepMap};
pub use messages::{Batch, Message, Submission};
pub use step::{Step, StepError};
pub use text::TextStep;
pub use transform::Transform;

//! The step contract.
//!
//! A step is an atomic, invertible document edit. The sync state machine in
//! collab-core never looks inside a step: it only applies, inverts and maps
//! steps through this trait, so any document model that implements it can be
//! synchronized.

use thiserror::Error;

use crate::map::{MappingSlice, StepMap};

/// Errors raised when a step cannot be applied to a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// The step touches positions past the end of the document.
    #[error("range {from}..{to} out of bounds for document of length {len}")]
    OutOfRange {
        /// Start of the range.
        from: usize,
        /// End of the range.
        to: usize,
        /// Length of the document.
        len: usize,
    },

    /// The range end lies before its start.
    #[error("inverted range {from}..{to}")]
    InvertedRange {
        /// Start of the range.
        from: usize,
        /// End of the range.
        to: usize,
    },

    /// Model-specific failure.
    #[error("{0}")]
    Invalid(String),
}

/// An atomic, invertible document edit.
pub trait Step: Clone + std::fmt::Debug {
    /// The document this step edits.
    type Doc: Clone + std::fmt::Debug;

    /// Apply the step, producing a new document.
    fn apply(&self, doc: &Self::Doc) -> Result<Self::Doc, StepError>;

    /// Build the step that undoes this one. `doc` is the document this step
    /// was applied to; the result applies to the document it produced.
    fn invert(&self, doc: &Self::Doc) -> Self;

    /// How this step moves positions.
    fn get_map(&self) -> StepMap;

    /// Re-derive this step on the far side of `mapping`.
    ///
    /// Returns `None` when the content the step targeted no longer exists.
    fn map(&self, mapping: &MappingSlice<'_>) -> Option<Self>;
}

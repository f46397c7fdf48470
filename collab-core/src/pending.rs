//! Pending step queue for collab-sync.
//!
//! Holds locally applied steps that the authority has not confirmed yet,
//! each paired with its inverse:
//! - FIFO ordering (local application order)
//! - O(1) removal of confirmed steps from the front
//! - Cheap snapshots: clones share one buffer
//!
//! Appending to a queue whose buffer is still shared with an older snapshot
//! copies the live entries first, so retained snapshots never change.

use std::sync::Arc;

/// A pending step and the step that undoes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rebaseable<S> {
    /// The step as applied locally.
    pub step: S,
    /// Its inverse, computed against the document the step was applied to.
    pub inverted: S,
}

impl<S> Rebaseable<S> {
    /// Pair a step with its inverse.
    pub fn new(step: S, inverted: S) -> Self {
        Self { step, inverted }
    }
}

/// Immutable queue of unconfirmed steps.
///
/// Entries before `start` have been confirmed and are logically gone.
#[derive(Debug, Clone)]
pub struct PendingQueue<S> {
    entries: Arc<Vec<Rebaseable<S>>>,
    start: usize,
}

impl<S: Clone> PendingQueue<S> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Vec::new()),
            start: 0,
        }
    }

    /// Create a queue holding `entries` in order.
    pub fn from_entries(entries: Vec<Rebaseable<S>>) -> Self {
        Self {
            entries: Arc::new(entries),
            start: 0,
        }
    }

    /// Live entries, oldest first.
    pub fn as_slice(&self) -> &[Rebaseable<S>] {
        &self.entries[self.start..]
    }

    /// Number of pending steps.
    pub fn len(&self) -> usize {
        self.entries.len() - self.start
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pending steps without their inverses.
    pub fn steps(&self) -> Vec<S> {
        self.as_slice().iter().map(|r| r.step.clone()).collect()
    }

    /// Inverses, in the same order as [`steps`](Self::steps).
    pub fn inverses(&self) -> Vec<S> {
        self.as_slice().iter().map(|r| r.inverted.clone()).collect()
    }

    /// Append entries at the back.
    pub fn extend(self, new: impl IntoIterator<Item = Rebaseable<S>>) -> Self {
        let Self { mut entries, start } = self;
        let buffer = Arc::make_mut(&mut entries);
        if start > 0 {
            buffer.drain(..start);
        }
        buffer.extend(new);
        Self { entries, start: 0 }
    }

    /// Remove up to `count` entries from the front.
    pub fn drop_front(self, count: usize) -> Self {
        let count = count.min(self.len());
        Self {
            entries: self.entries,
            start: self.start + count,
        }
    }
}

impl<S: Clone> Default for PendingQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + PartialEq> PartialEq for PendingQueue<S> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<S: Clone + Eq> Eq for PendingQueue<S> {}

//! Plain-text reference step model.
//!
//! Documents are `String`s and positions are character offsets. A single
//! step kind, [`TextStep`], replaces the characters in `from..to` with
//! `insert`; insertions and deletions are the degenerate cases.

use serde::{Deserialize, Serialize};

use crate::map::{Assoc, MappingSlice, StepMap};
use crate::step::{Step, StepError};

/// Replace the characters in `from..to` with `insert`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextStep {
    /// Start of the replaced range (character offset).
    pub from: usize,
    /// End of the replaced range (character offset, exclusive).
    pub to: usize,
    /// Replacement text.
    pub insert: String,
}

impl TextStep {
    /// Replace `from..to` with `text`.
    pub fn replace(from: usize, to: usize, text: impl Into<String>) -> Self {
        Self {
            from,
            to,
            insert: text.into(),
        }
    }

    /// Insert `text` at `at`.
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }

    /// Delete `from..to`.
    pub fn delete(from: usize, to: usize) -> Self {
        Self::replace(from, to, String::new())
    }

    fn insert_len(&self) -> usize {
        self.insert.chars().count()
    }
}

/// Byte offset of character `pos`, or `None` past the end.
fn byte_offset(doc: &str, pos: usize) -> Option<usize> {
    if pos == 0 {
        return Some(0);
    }
    doc.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(doc.len()))
        .nth(pos)
}

impl Step for TextStep {
    type Doc = String;

    fn apply(&self, doc: &String) -> Result<String, StepError> {
        if self.to < self.from {
            return Err(StepError::InvertedRange {
                from: self.from,
                to: self.to,
            });
        }
        let out_of_range = || StepError::OutOfRange {
            from: self.from,
            to: self.to,
            len: doc.chars().count(),
        };
        let start = byte_offset(doc, self.from).ok_or_else(out_of_range)?;
        let end = byte_offset(doc, self.to).ok_or_else(out_of_range)?;

        let mut out = String::with_capacity(doc.len() - (end - start) + self.insert.len());
        out.push_str(&doc[..start]);
        out.push_str(&self.insert);
        out.push_str(&doc[end..]);
        Ok(out)
    }

    fn invert(&self, doc: &String) -> Self {
        let removed: String = doc
            .chars()
            .skip(self.from)
            .take(self.to.saturating_sub(self.from))
            .collect();
        Self {
            from: self.from,
            to: self.from + self.insert_len(),
            insert: removed,
        }
    }

    fn get_map(&self) -> StepMap {
        StepMap::single(
            self.from,
            self.to.saturating_sub(self.from),
            self.insert_len(),
        )
    }

    fn map(&self, mapping: &MappingSlice<'_>) -> Option<Self> {
        let from = mapping.map_result(self.from, Assoc::After);
        let to = mapping.map_result(self.to, Assoc::Before);
        if from.deleted_across && to.deleted_across {
            return None;
        }
        Some(Self {
            from: from.pos,
            to: from.pos.max(to.pos),
            insert: self.insert.clone(),
        })
    }
}

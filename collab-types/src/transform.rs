//! Step composition.

use crate::map::Mapping;
use crate::step::{Step, StepError};

/// An ordered composition of steps over a starting document.
///
/// Keeps the document preceding every step, so inverses can be computed
/// after the fact, and the accumulated [`Mapping`].
#[derive(Debug, Clone)]
pub struct Transform<S: Step> {
    doc: S::Doc,
    steps: Vec<S>,
    docs: Vec<S::Doc>,
    mapping: Mapping,
}

impl<S: Step> Transform<S> {
    /// Start a transform at `doc`.
    pub fn new(doc: S::Doc) -> Self {
        Self {
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    /// Apply a step, failing if it does not fit the current document.
    pub fn step(&mut self, step: S) -> Result<&mut Self, StepError> {
        self.maybe_step(step)?;
        Ok(self)
    }

    /// Try to apply a step. On failure the transform is left unchanged.
    pub fn maybe_step(&mut self, step: S) -> Result<(), StepError> {
        let next = step.apply(&self.doc)?;
        self.mapping.append_map(step.get_map());
        let before = std::mem::replace(&mut self.doc, next);
        self.docs.push(before);
        self.steps.push(step);
        Ok(())
    }

    /// The current document.
    pub fn doc(&self) -> &S::Doc {
        &self.doc
    }

    /// The applied steps.
    pub fn steps(&self) -> &[S] {
        &self.steps
    }

    /// The document preceding step `index`.
    pub fn doc_before(&self, index: usize) -> Option<&S::Doc> {
        self.docs.get(index)
    }

    /// Accumulated mapping of all steps.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Mutable access to the mapping, for registering mirrors.
    pub fn mapping_mut(&mut self) -> &mut Mapping {
        &mut self.mapping
    }

    /// Number of applied steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if no step has been applied.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Each step from `start` on, paired with the document it was applied to.
    pub fn steps_with_docs(&self, start: usize) -> impl Iterator<Item = (&S, &S::Doc)> + '_ {
        self.steps
            .iter()
            .zip(self.docs.iter())
            .skip(start)
    }

    /// Consume the transform, returning the final document.
    pub fn into_doc(self) -> S::Doc {
        self.doc
    }
}

//! Rebase engine.
//!
//! Moves pending local steps to the far side of newly confirmed remote steps.
//! The transform first undoes the local steps (newest first), then applies
//! the remote steps, then re-applies each local step mapped through
//! everything after its own original position. Each re-applied step is
//! registered as the mirror of its inverse so that later local steps which
//! point into content it inserted land in the right place.
//!
//! A local step whose target content was removed by the remote steps cannot
//! be mapped and is dropped. That is a rebase conflict resolved by policy,
//! not an error.

use collab_types::{Step, StepError, Transform};

use crate::pending::Rebaseable;

/// What happened to the local steps during a rebase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebaseOutcome {
    /// Local steps re-applied after the remote steps.
    pub applied: usize,
    /// Local steps dropped because they no longer fit the document.
    pub dropped: usize,
}

/// Rebase `steps` over `over`, appending everything to `tr`.
///
/// `tr` must currently hold the document with `steps` applied, and
/// `inverted[i]` must undo `steps[i]`.
///
/// # Errors
///
/// Fails only when an inverse or a remote step does not apply, which means
/// the inputs did not describe the document in `tr`.
pub fn rebase_steps<S: Step>(
    tr: &mut Transform<S>,
    steps: &[S],
    inverted: &[S],
    over: &[S],
) -> Result<RebaseOutcome, StepError> {
    if steps.len() != inverted.len() {
        return Err(StepError::Invalid(format!(
            "{} steps but {} inverses",
            steps.len(),
            inverted.len()
        )));
    }

    let base = tr.len();
    for step in inverted.iter().rev() {
        tr.step(step.clone())?;
    }
    for step in over {
        tr.step(step.clone())?;
    }

    let mut outcome = RebaseOutcome::default();
    let mut map_from = base + inverted.len();
    for step in steps {
        let mapped = step.map(&tr.mapping().slice(map_from));
        map_from -= 1;
        let Some(mapped) = mapped else {
            tracing::debug!(?step, "local step lost its target during rebase");
            outcome.dropped += 1;
            continue;
        };
        match tr.maybe_step(mapped) {
            Ok(()) => {
                let last = tr.len() - 1;
                tr.mapping_mut().set_mirror(map_from, last);
                outcome.applied += 1;
            }
            Err(e) => {
                tracing::debug!(?step, error = %e, "rebased step no longer applies");
                outcome.dropped += 1;
            }
        }
    }
    Ok(outcome)
}

/// Pair every step of `tr` from index `start` on with its inverse.
pub fn rebaseable_steps_from<S: Step>(tr: &Transform<S>, start: usize) -> Vec<Rebaseable<S>> {
    tr.steps_with_docs(start)
        .map(|(step, doc)| Rebaseable::new(step.clone(), step.invert(doc)))
        .collect()
}

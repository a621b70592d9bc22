//! Value movement between connected nodes.
//!
//! Outputs are opt-out: without a rule entry they pass through under their
//! own name, and a rule can redirect or rename them. Parameters are opt-in:
//! they are never sent to a child unless a rule names them explicitly. The
//! rule table consulted is the receiving node's.

use crate::error::{FailureReason, PropagationError, SlotFailure};
use crate::node::NodeHandle;
use crate::slot::SlotKind;

/// Pull every propagable slot of `parent` into `child`.
///
/// Best-effort: a pair whose source is unreadable or whose destination slot
/// is missing or ill-typed is recorded as a failure while all remaining
/// pairs are still applied. The call reports `Err` iff at least one pair
/// failed.
pub fn pull_inputs(child: &NodeHandle, parent: &NodeHandle) -> Result<(), PropagationError> {
    // Snapshot the parent side first; the two nodes are never locked at once.
    let sources = parent.read_propagable_slots();
    let parent_label = parent.label().to_string();
    let rules = child.rules();

    let mut failures = Vec::new();
    for (slot, value) in sources {
        let destination = match slot.kind {
            SlotKind::Parameter => match rules.resolve(slot.name, &parent_label) {
                Some(destination) => destination.to_string(),
                // Parameters without an explicit rule entry are never sent.
                None => continue,
            },
            _ => rules
                .resolve(slot.name, &parent_label)
                .unwrap_or(slot.name)
                .to_string(),
        };

        let target = child
            .find_slot(&destination)
            .filter(|s| s.is_writable())
            .cloned();
        let Some(target) = target else {
            failures.push(SlotFailure {
                source: slot.name.to_string(),
                destination,
                reason: FailureReason::NoSuchDestination,
            });
            continue;
        };
        let Some(value) = value else {
            failures.push(SlotFailure {
                source: slot.name.to_string(),
                destination,
                reason: FailureReason::SourceUnreadable,
            });
            continue;
        };
        if !target.ty.admits(&value) {
            failures.push(SlotFailure {
                source: slot.name.to_string(),
                destination,
                reason: FailureReason::TypeMismatch,
            });
            continue;
        }
        child.write_slot(&target, value);
    }

    if failures.is_empty() {
        Ok(())
    } else {
        let error = PropagationError { failures };
        tracing::warn!(parent = %parent, child = %child, error = %error, "partial propagation");
        Err(error)
    }
}

//! Batch accept/reject processing.
//!
//! Decisions verify before they mutate. Accept is pure bookkeeping — the
//! tracked text is already in the document. Reject re-reads the live text
//! at each change's current span and refuses to touch anything that
//! diverged from the recorded snapshot; within a batch, reverts run from
//! the highest span down so earlier reverts cannot shift later targets.

use chrono::{DateTime, Utc};
use redline_primitives::{Change, ChangeId, ChangeKind, ChangeStatus, Tendril};
use thiserror::Error;

use crate::ids::DocumentId;
use crate::ledger::ChangeLedger;
use crate::surface::{EditorSurface, SurfaceEdit};

/// What to do with the targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
	/// Keep the edits; stop tracking them as pending.
	Accept,
	/// Restore the pre-edit text and mark the changes rejected.
	Reject,
}

/// Why a target was skipped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	/// The change already reached a terminal status; re-deciding is an
	/// idempotent no-op.
	AlreadyDecided,
}

/// Why a target failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionError {
	/// The live document no longer matches the recorded text; the reject
	/// was aborted and the change needs re-review.
	#[error("live text {found:?} diverged from recorded {expected:?}")]
	TextMismatch {
		/// The recorded post-edit snapshot.
		expected: Tendril,
		/// What the document holds now.
		found: Tendril,
	},
	/// The change was invalidated by an earlier overlapping mutation and
	/// cannot be safely acted on.
	#[error("change is no longer safely actionable")]
	InvalidChange,
	/// No such change in this document's ledger.
	#[error("unknown change id")]
	UnknownChange,
}

/// A target skipped as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedItem {
	/// The skipped change.
	pub id: ChangeId,
	/// Why it was skipped.
	pub reason: SkipReason,
}

/// A target that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedItem {
	/// The failed change.
	pub id: ChangeId,
	/// What went wrong.
	pub error: DecisionError,
}

/// Per-item results of one decision batch.
///
/// The three buckets are deliberately distinct so a review UI can render
/// "decided", "skipped — already decided", and "skipped — text changed
/// underneath you" differently; a mismatch is never silently dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
	/// Targets that reached their terminal status.
	pub processed: Vec<ChangeId>,
	/// Idempotent no-ops.
	pub skipped: Vec<SkippedItem>,
	/// Targets that failed, each with its reason.
	pub failed: Vec<FailedItem>,
	/// Bystander changes invalidated by the batch's reverts.
	pub invalidated: Vec<ChangeId>,
}

/// Runs one decision batch against the ledger and surface.
///
/// Every target is attempted; one failure never blocks the others. The
/// caller holds the per-document single-flight guard.
pub(crate) fn decide(
	ledger: &mut ChangeLedger,
	surface: &mut dyn EditorSurface,
	document: DocumentId,
	targets: &[ChangeId],
	decision: Decision,
	now: DateTime<Utc>,
) -> BatchOutcome {
	let mut outcome = BatchOutcome::default();
	let mut actionable: Vec<Change> = Vec::new();

	for &id in targets {
		match ledger.change(document, id) {
			None => outcome.failed.push(FailedItem {
				id,
				error: DecisionError::UnknownChange,
			}),
			Some(change) if change.status.is_terminal() => outcome.skipped.push(SkippedItem {
				id,
				reason: SkipReason::AlreadyDecided,
			}),
			Some(change) if change.status == ChangeStatus::Invalid => {
				outcome.failed.push(FailedItem {
					id,
					error: DecisionError::InvalidChange,
				});
			}
			Some(change) => {
				// A duplicate target would double-process; treat the
				// second occurrence as already decided.
				if actionable.iter().any(|c| c.id == id) {
					outcome.skipped.push(SkippedItem {
						id,
						reason: SkipReason::AlreadyDecided,
					});
				} else {
					actionable.push(change.clone());
				}
			}
		}
	}

	match decision {
		Decision::Accept => {
			for change in &actionable {
				ledger.finalize(document, change.id, ChangeStatus::Accepted, now);
				outcome.processed.push(change.id);
			}
		}
		Decision::Reject => {
			// Highest span first: a revert can only move text above the
			// remaining targets.
			actionable.sort_by(|a, b| (b.span, b.id).cmp(&(a.span, a.id)));
			for change in &actionable {
				match reject_one(ledger, surface, document, change, now) {
					Ok(invalidated) => {
						outcome.processed.push(change.id);
						outcome.invalidated.extend(invalidated);
					}
					Err(error) => outcome.failed.push(FailedItem {
						id: change.id,
						error,
					}),
				}
			}
		}
	}

	tracing::debug!(
		%document,
		decision = ?decision,
		processed = outcome.processed.len(),
		skipped = outcome.skipped.len(),
		failed = outcome.failed.len(),
		"decision.batch"
	);
	outcome
}

/// Verifies and reverts a single change.
///
/// Per-kind revert: an Insert's span is deleted, a Replace's span is
/// restored to the pre-edit text, a Delete re-inserts the removed text at
/// its collapsed position. The live text is read immediately before the
/// mutation; on divergence the document is untouched and the change stays
/// pending.
fn reject_one(
	ledger: &mut ChangeLedger,
	surface: &mut dyn EditorSurface,
	document: DocumentId,
	change: &Change,
	now: DateTime<Utc>,
) -> Result<Vec<ChangeId>, DecisionError> {
	let expected = &change.content.after;
	// A span past the end of the document can never match the recorded text.
	let Some(found) = surface.text_in(change.span) else {
		return Err(DecisionError::TextMismatch {
			expected: expected.clone(),
			found: Tendril::new(),
		});
	};
	if found != *expected {
		return Err(DecisionError::TextMismatch {
			expected: expected.clone(),
			found,
		});
	}
	debug_assert!(matches!(change.kind, ChangeKind::Delete) == change.span.is_empty());

	// Terminalize before folding the revert so the change's own frozen
	// span is not remapped against its own mutation.
	ledger.finalize(document, change.id, ChangeStatus::Rejected, now);
	let mutations = surface.apply(&[SurfaceEdit {
		span: change.span,
		replacement: change.content.before.clone(),
	}]);

	let mut invalidated = Vec::new();
	for mutation in &mutations {
		invalidated.extend(ledger.apply_mutation(document, mutation).invalidated);
	}
	Ok(invalidated)
}

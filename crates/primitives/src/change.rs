use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::span::{CharIdx, Span, Tendril};

/// Opaque stable identifier for a tracked change.
///
/// Assigned by the ledger at record time from a monotonic counter and never
/// reused, even after the change reaches a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChangeId(pub u64);

impl std::fmt::Display for ChangeId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "change:{}", self.0)
	}
}

/// The shape of an atomic edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
	/// New text was added; `content.before` is empty.
	Insert,
	/// Text was removed; `content.after` is empty and the span is collapsed.
	Delete,
	/// Text was substituted; both content snapshots are populated.
	Replace,
}

/// Lifecycle status of a tracked change.
///
/// `Pending` and `Invalid` are the open states; `Accepted` and `Rejected`
/// are terminal and immutable. `Invalid` marks a pending change whose span
/// could not be safely remapped after a later mutation: it is kept for
/// audit but excluded from clustering, decoration, and decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeStatus {
	/// Awaiting review; span tracks the live document.
	Pending,
	/// Still open, but no longer safely actionable.
	Invalid,
	/// Kept; the tracked text stays in the document.
	Accepted,
	/// Reverted; the pre-edit text was restored.
	Rejected,
}

impl ChangeStatus {
	/// Returns true for the immutable end states.
	#[inline]
	pub fn is_terminal(self) -> bool {
		matches!(self, ChangeStatus::Accepted | ChangeStatus::Rejected)
	}

	/// Returns true when the change can still be accepted or rejected.
	#[inline]
	pub fn is_actionable(self) -> bool {
		matches!(self, ChangeStatus::Pending)
	}

	/// Returns true for the non-terminal states, including `Invalid`.
	#[inline]
	pub fn is_open(self) -> bool {
		matches!(self, ChangeStatus::Pending | ChangeStatus::Invalid)
	}
}

/// Who produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
	/// Typed directly by the user.
	User,
	/// Proposed by an AI suggestion source.
	Ai,
	/// Merged from a collaborator.
	Collaboration,
	/// Produced by the host itself (formatters, refactors).
	System,
}

/// Provenance attached to every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSource {
	/// Producer category.
	pub kind: SourceKind,
	/// Producer-specific identifier (model name, collaborator id, ...).
	pub origin: String,
	/// Producer confidence in `[0, 1]`.
	pub confidence: f64,
}

impl ChangeSource {
	/// Creates a source record.
	pub fn new(kind: SourceKind, origin: impl Into<String>, confidence: f64) -> Self {
		Self {
			kind,
			origin: origin.into(),
			confidence,
		}
	}
}

/// Text snapshots on both sides of a change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeContent {
	/// Text present before the edit; empty for `Insert`.
	pub before: Tendril,
	/// Text present after the edit; empty for `Delete`.
	pub after: Tendril,
}

/// One atomic tracked edit.
///
/// The `span` addresses `content.after` in the live document and is only
/// meaningful while the change is open; the ledger remaps it after every
/// later mutation. Once terminal, the span is frozen for audit and no
/// longer remapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
	/// Stable identity, never reused.
	pub id: ChangeId,
	/// Edit shape.
	pub kind: ChangeKind,
	/// Current location in the live document.
	pub span: Span,
	/// Before/after text snapshots.
	pub content: ChangeContent,
	/// Provenance and confidence.
	pub source: ChangeSource,
	/// Free-form classification tag (grammar, style, structure, ...).
	pub category: String,
	/// Lifecycle status.
	pub status: ChangeStatus,
	/// Creation time.
	pub recorded_at: DateTime<Utc>,
	/// When the change reached a terminal status.
	pub decided_at: Option<DateTime<Utc>>,
}

/// A change submission, before the ledger assigns identity and status.
///
/// The constructors derive `kind` and the content shape from their
/// arguments so the shape invariants hold by construction; [`validate`]
/// re-checks them for drafts built field-by-field.
///
/// [`validate`]: ChangeDraft::validate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDraft {
	/// Edit shape.
	pub kind: ChangeKind,
	/// Location of `content.after` in the document as submitted.
	pub span: Span,
	/// Before/after text snapshots.
	pub content: ChangeContent,
	/// Provenance and confidence.
	pub source: ChangeSource,
	/// Free-form classification tag.
	pub category: String,
}

impl ChangeDraft {
	/// Creates an insert draft for text now living at `at`.
	pub fn insert(at: CharIdx, text: impl Into<Tendril>, source: ChangeSource, category: impl Into<String>) -> Self {
		let text = text.into();
		let len = text.chars().count();
		Self {
			kind: ChangeKind::Insert,
			span: Span::new(at, at + len),
			content: ChangeContent {
				before: Tendril::new(),
				after: text,
			},
			source,
			category: category.into(),
		}
	}

	/// Creates a delete draft for text removed at `at`.
	///
	/// The span is collapsed to a point: the removed text no longer occupies
	/// characters in the live document.
	pub fn delete(at: CharIdx, removed: impl Into<Tendril>, source: ChangeSource, category: impl Into<String>) -> Self {
		Self {
			kind: ChangeKind::Delete,
			span: Span::point(at),
			content: ChangeContent {
				before: removed.into(),
				after: Tendril::new(),
			},
			source,
			category: category.into(),
		}
	}

	/// Creates a replace draft: `before` was substituted by `after` at `at`.
	pub fn replace(
		at: CharIdx,
		before: impl Into<Tendril>,
		after: impl Into<Tendril>,
		source: ChangeSource,
		category: impl Into<String>,
	) -> Self {
		let after = after.into();
		let len = after.chars().count();
		Self {
			kind: ChangeKind::Replace,
			span: Span::new(at, at + len),
			content: ChangeContent {
				before: before.into(),
				after,
			},
			source,
			category: category.into(),
		}
	}

	/// Checks the draft invariants the ledger relies on.
	///
	/// # Errors
	/// Returns the first violated [`ValidationError`]; a draft that passes
	/// enters the ledger unmodified.
	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.span.start > self.span.end {
			return Err(ValidationError::InvertedSpan {
				start: self.span.start,
				end: self.span.end,
			});
		}
		if !self.source.confidence.is_finite()
			|| !(0.0..=1.0).contains(&self.source.confidence)
		{
			return Err(ValidationError::ConfidenceOutOfRange(self.source.confidence));
		}
		if self.source.origin.is_empty() {
			return Err(ValidationError::MissingOrigin);
		}
		if self.category.is_empty() {
			return Err(ValidationError::EmptyCategory);
		}
		let shape_ok = match self.kind {
			ChangeKind::Insert => {
				self.content.before.is_empty()
					&& !self.content.after.is_empty()
					&& self.span.len() == self.content.after.chars().count()
			}
			ChangeKind::Delete => {
				self.content.after.is_empty()
					&& !self.content.before.is_empty()
					&& self.span.is_empty()
			}
			ChangeKind::Replace => {
				!self.content.before.is_empty()
					&& !self.content.after.is_empty()
					&& self.span.len() == self.content.after.chars().count()
			}
		};
		if !shape_ok {
			return Err(ValidationError::ContentShape { kind: self.kind });
		}
		Ok(())
	}
}

/// Reasons a draft is refused before entering the ledger.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
	/// `span.start` exceeds `span.end`.
	#[error("span start {start} exceeds end {end}")]
	InvertedSpan {
		/// Submitted start offset.
		start: CharIdx,
		/// Submitted end offset.
		end: CharIdx,
	},
	/// Confidence is NaN, infinite, or outside `[0, 1]`.
	#[error("confidence {0} outside [0, 1]")]
	ConfidenceOutOfRange(f64),
	/// The source carries no origin identifier.
	#[error("change source has no origin identifier")]
	MissingOrigin,
	/// The category tag is empty.
	#[error("change category is empty")]
	EmptyCategory,
	/// Content snapshots are inconsistent with the declared kind.
	#[error("content snapshots inconsistent with {kind:?} change")]
	ContentShape {
		/// Declared edit shape.
		kind: ChangeKind,
	},
}

//! Document mutation events and pure span remapping.
//!
//! The host editor delivers one [`DocumentMutation`] per committed
//! transaction step. [`remap_span`] answers, for a single tracked span,
//! where that span lives after the mutation — or that it cannot be safely
//! relocated. Remapping is a pure function of `(span, mutation)`; callers
//! own ordering across multiple spans.

use serde::{Deserialize, Serialize};

use crate::span::{CharIdx, CharLen, Span};

/// One committed editor transaction step.
///
/// `span` is the replaced range in pre-mutation coordinates; `inserted` is
/// the character length of the replacement text. A pure insertion has a
/// collapsed span, a pure deletion has `inserted == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMutation {
	/// The replaced range, in pre-mutation coordinates.
	pub span: Span,
	/// Character length of the replacement text.
	pub inserted: CharLen,
}

impl DocumentMutation {
	/// An insertion of `inserted` characters at `pos`.
	pub fn insert_at(pos: CharIdx, inserted: CharLen) -> Self {
		Self {
			span: Span::point(pos),
			inserted,
		}
	}

	/// A deletion of the given range.
	pub fn delete_range(span: Span) -> Self {
		Self { span, inserted: 0 }
	}

	/// A replacement of `span` by `inserted` characters.
	pub fn replace_range(span: Span, inserted: CharLen) -> Self {
		Self { span, inserted }
	}

	/// Character count removed by this mutation.
	#[inline]
	pub fn removed(&self) -> CharLen {
		self.span.len()
	}

	/// Net change in document length.
	#[inline]
	pub fn len_delta(&self) -> isize {
		self.inserted as isize - self.removed() as isize
	}
}

/// Where a tracked span lives after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapOutcome {
	/// The mutation happened at or past the span's end; nothing moved.
	Unchanged,
	/// The mutation happened before the span; both offsets shifted.
	Shifted(Span),
	/// The mutation intersected the tracked text. The recorded content
	/// snapshot can no longer be trusted at any relocated position.
	Invalidated,
}

/// Maps a tracked span through one document mutation.
///
/// Boundary bias follows insertion mapping in the changeset model: an
/// insertion exactly at `span.start` pushes the span right, an insertion
/// exactly at `span.end` leaves it alone. Any mutation that intersects the
/// tracked text — truncation from either side, an edit strictly inside, or
/// an engulfing replacement — yields [`RemapOutcome::Invalidated`] rather
/// than a best-effort relocation.
pub fn remap_span(span: Span, mutation: &DocumentMutation) -> RemapOutcome {
	let m = mutation.span;

	// Entirely before the span (or touching its start): shift by the net
	// length delta. Covers insertion exactly at span.start (right bias).
	if m.end <= span.start {
		let delta = mutation.len_delta();
		if delta == 0 {
			return RemapOutcome::Unchanged;
		}
		return RemapOutcome::Shifted(span.shifted_by(delta));
	}

	// Entirely after the span (or touching its end): left bias at the
	// tail, the span does not grow.
	if m.start >= span.end {
		return RemapOutcome::Unchanged;
	}

	RemapOutcome::Invalidated
}

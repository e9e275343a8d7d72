//! The editor surface boundary.
//!
//! The engine never owns the live document: hosts implement
//! [`EditorSurface`] over their buffer. Reject is the only engine path
//! that writes through this trait, and it batches its edits in descending
//! span order so earlier applications cannot shift later ones.

use redline_primitives::{CharLen, DocumentMutation, Span, Tendril};
use ropey::Rope;

/// One text replacement for the surface to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceEdit {
	/// Character range to replace.
	pub span: Span,
	/// New text content.
	pub replacement: Tendril,
}

/// Read/write access to one live document.
pub trait EditorSurface {
	/// Current document length in characters.
	fn len_chars(&self) -> CharLen;

	/// The live text at a span, or `None` when the span runs past the end
	/// of the document.
	fn text_in(&self, span: Span) -> Option<Tendril>;

	/// Applies a batch of edits as one atomic operation.
	///
	/// Edits must be non-overlapping and sorted by descending span start;
	/// each edit's span is then valid in the coordinates it was submitted
	/// in. Returns the equivalent mutations in application order, for
	/// folding back into the ledger.
	fn apply(&mut self, edits: &[SurfaceEdit]) -> Vec<DocumentMutation>;
}

/// Rope-backed in-memory surface.
///
/// The reference implementation for tests and for hosts that let the
/// engine own a mirror of the document.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
	rope: Rope,
}

impl MemorySurface {
	/// Creates a surface over the given text.
	pub fn from_text(text: &str) -> Self {
		Self {
			rope: Rope::from(text),
		}
	}

	/// The full document text.
	pub fn text(&self) -> String {
		self.rope.to_string()
	}

	/// Applies a host-side edit and returns the mutation to feed the
	/// position mapper, the shape a real editor would deliver.
	pub fn splice(&mut self, span: Span, text: &str) -> DocumentMutation {
		debug_assert!(span.end <= self.rope.len_chars());
		self.rope.remove(span.start..span.end);
		self.rope.insert(span.start, text);
		DocumentMutation::replace_range(span, text.chars().count())
	}
}

impl EditorSurface for MemorySurface {
	fn len_chars(&self) -> CharLen {
		self.rope.len_chars()
	}

	fn text_in(&self, span: Span) -> Option<Tendril> {
		if span.end > self.rope.len_chars() {
			return None;
		}
		Some(self.rope.slice(span.start..span.end).to_string())
	}

	fn apply(&mut self, edits: &[SurfaceEdit]) -> Vec<DocumentMutation> {
		debug_assert!(
			edits.windows(2).all(|w| w[1].span.end <= w[0].span.start),
			"surface edits must be non-overlapping and sorted descending"
		);
		edits
			.iter()
			.map(|edit| {
				self.rope.remove(edit.span.start..edit.span.end);
				self.rope.insert(edit.span.start, &edit.replacement);
				DocumentMutation::replace_range(edit.span, edit.replacement.chars().count())
			})
			.collect()
	}
}

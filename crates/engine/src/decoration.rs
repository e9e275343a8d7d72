//! Transient visual markers derived from pending changes.
//!
//! Decorations are never stored: they are recomputed from the actionable
//! pending snapshot whenever the caller needs them, so a change leaving
//! `Pending` — or going `Invalid` — drops its marker by construction.

use redline_primitives::{Change, ChangeId, ChangeKind, Span, Tendril};

/// How a marker renders, as a tagged variant dispatched by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationKind {
	/// Highlight over inserted text.
	Insert,
	/// Highlight over replacement text.
	Replace,
	/// An inline widget showing removed text at a collapsed position.
	DeleteWidget(Tendril),
}

/// A positional marker mirroring one pending change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
	/// The mirrored change.
	pub change: ChangeId,
	/// Current position in the live document.
	pub span: Span,
	/// Render variant.
	pub kind: DecorationKind,
}

/// Derives the marker set for an actionable pending snapshot.
pub fn decorations(pending: &[Change]) -> Vec<Decoration> {
	let mut out: Vec<Decoration> = pending
		.iter()
		.filter(|change| change.status.is_actionable())
		.map(|change| Decoration {
			change: change.id,
			span: change.span,
			kind: match change.kind {
				ChangeKind::Insert => DecorationKind::Insert,
				ChangeKind::Replace => DecorationKind::Replace,
				ChangeKind::Delete => DecorationKind::DeleteWidget(change.content.before.clone()),
			},
		})
		.collect();
	out.sort_by_key(|d| (d.span, d.change));
	out
}

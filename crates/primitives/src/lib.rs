//! Core types for edit tracking: spans, change records, and position remapping.

/// Tracked change records: drafts, identity, lifecycle status, provenance.
pub mod change;
/// Document mutation events and pure span remapping.
pub mod mutation;
/// Character-offset span types.
pub mod span;

pub use change::{
	Change, ChangeContent, ChangeDraft, ChangeId, ChangeKind, ChangeSource, ChangeStatus,
	SourceKind, ValidationError,
};
pub use mutation::{DocumentMutation, RemapOutcome, remap_span};
pub use span::{CharIdx, CharLen, Span, Tendril};

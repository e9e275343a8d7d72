//! The change ledger and position mapping.
//!
//! Single source of truth for tracked changes. Writes flow through the
//! serialized mutation and decision paths; reads hand out snapshots.
//! Position remapping is strictly ordered: one mutation pass runs to
//! completion before the next is accepted, and within a pass changes are
//! processed in ascending original span order.

use chrono::{DateTime, Utc};
use redline_primitives::{
	Change, ChangeDraft, ChangeId, ChangeStatus, DocumentMutation, RemapOutcome, ValidationError,
	remap_span,
};
use rustc_hash::FxHashMap;

use crate::ids::DocumentId;

/// Read filter for [`ChangeLedger::changes`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeFilter {
	/// Keep only this category.
	pub category: Option<String>,
	/// Keep only changes at or above this confidence.
	pub min_confidence: Option<f64>,
	/// Keep only this status.
	pub status: Option<ChangeStatus>,
}

impl ChangeFilter {
	fn matches(&self, change: &Change) -> bool {
		if let Some(category) = &self.category
			&& change.category != *category
		{
			return false;
		}
		if let Some(min) = self.min_confidence
			&& change.source.confidence < min
		{
			return false;
		}
		if let Some(status) = self.status
			&& change.status != status
		{
			return false;
		}
		true
	}
}

/// What one mutation pass did to a document's open changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationReport {
	/// Open changes whose spans were shifted.
	pub shifted: usize,
	/// Changes flipped from `Pending` to `Invalid`.
	pub invalidated: Vec<ChangeId>,
}

/// Per-document change store.
#[derive(Debug, Default)]
struct DocumentChanges {
	/// In recording order; ids are unique across documents.
	changes: Vec<Change>,
}

/// Stores every tracked change for every document.
#[derive(Debug, Default)]
pub struct ChangeLedger {
	documents: FxHashMap<DocumentId, DocumentChanges>,
	next_id: u64,
}

impl ChangeLedger {
	/// Creates an empty ledger.
	pub fn new() -> Self {
		Self::default()
	}

	/// Validates and appends a draft as a pending change.
	///
	/// # Errors
	/// Returns the draft's [`ValidationError`] unchanged; nothing enters
	/// the ledger on failure.
	pub fn record(
		&mut self,
		document: DocumentId,
		draft: ChangeDraft,
		now: DateTime<Utc>,
	) -> Result<ChangeId, ValidationError> {
		draft.validate()?;
		self.next_id += 1;
		let id = ChangeId(self.next_id);
		let change = Change {
			id,
			kind: draft.kind,
			span: draft.span,
			content: draft.content,
			source: draft.source,
			category: draft.category,
			status: ChangeStatus::Pending,
			recorded_at: now,
			decided_at: None,
		};
		tracing::trace!(%document, %id, kind = ?change.kind, span = %change.span, "ledger.record");
		self.documents.entry(document).or_default().changes.push(change);
		Ok(id)
	}

	/// Records a batch as one unit with each item validated independently.
	///
	/// Partial success is expected: one malformed draft does not block the
	/// rest.
	pub fn record_batch(
		&mut self,
		document: DocumentId,
		drafts: Vec<ChangeDraft>,
		now: DateTime<Utc>,
	) -> Vec<Result<ChangeId, ValidationError>> {
		drafts
			.into_iter()
			.map(|draft| self.record(document, draft, now))
			.collect()
	}

	/// Remaps every open change through one document mutation.
	///
	/// Changes are processed in ascending original span order so one
	/// transaction's effects land consistently. A span the mutation
	/// intersects flips to `Invalid` — kept for audit, excluded from
	/// clustering and decoration — rather than being relocated on a guess.
	pub fn apply_mutation(
		&mut self,
		document: DocumentId,
		mutation: &DocumentMutation,
	) -> MutationReport {
		let mut report = MutationReport::default();
		let Some(doc) = self.documents.get_mut(&document) else {
			return report;
		};

		let mut order: Vec<usize> = (0..doc.changes.len())
			.filter(|&i| doc.changes[i].status.is_actionable())
			.collect();
		order.sort_by_key(|&i| (doc.changes[i].span, doc.changes[i].id));

		for idx in order {
			let change = &mut doc.changes[idx];
			match remap_span(change.span, mutation) {
				RemapOutcome::Unchanged => {}
				RemapOutcome::Shifted(span) => {
					change.span = span;
					report.shifted += 1;
				}
				RemapOutcome::Invalidated => {
					change.status = ChangeStatus::Invalid;
					tracing::debug!(%document, id = %change.id, span = %change.span, "ledger.invalidated");
					report.invalidated.push(change.id);
				}
			}
		}
		report
	}

	/// Returns the changes matching a filter, in recording order.
	pub fn changes(&self, document: DocumentId, filter: &ChangeFilter) -> Vec<Change> {
		self.documents
			.get(&document)
			.map(|doc| {
				doc.changes
					.iter()
					.filter(|c| filter.matches(c))
					.cloned()
					.collect()
			})
			.unwrap_or_default()
	}

	/// Returns the actionable pending snapshot — the clustering and
	/// decoration input.
	pub fn pending(&self, document: DocumentId) -> Vec<Change> {
		self.documents
			.get(&document)
			.map(|doc| {
				doc.changes
					.iter()
					.filter(|c| c.status.is_actionable())
					.cloned()
					.collect()
			})
			.unwrap_or_default()
	}

	/// Looks up one change.
	pub fn change(&self, document: DocumentId, id: ChangeId) -> Option<&Change> {
		self.documents
			.get(&document)?
			.changes
			.iter()
			.find(|c| c.id == id)
	}

	/// Moves an actionable change to a terminal status.
	///
	/// Returns the previous status, or `None` if the change is unknown.
	/// Callers are expected to have checked actionability; a terminal
	/// change is left untouched and its current status returned.
	pub(crate) fn finalize(
		&mut self,
		document: DocumentId,
		id: ChangeId,
		status: ChangeStatus,
		now: DateTime<Utc>,
	) -> Option<ChangeStatus> {
		debug_assert!(status.is_terminal());
		let change = self
			.documents
			.get_mut(&document)?
			.changes
			.iter_mut()
			.find(|c| c.id == id)?;
		let previous = change.status;
		if previous.is_terminal() {
			return Some(previous);
		}
		change.status = status;
		change.decided_at = Some(now);
		tracing::debug!(%document, %id, from = ?previous, to = ?status, "ledger.finalize");
		Some(previous)
	}

	/// Open changes plus the newest `terminal_cap` terminal ones, for
	/// session snapshots.
	pub fn snapshot_changes(&self, document: DocumentId, terminal_cap: usize) -> Vec<Change> {
		let Some(doc) = self.documents.get(&document) else {
			return Vec::new();
		};
		let mut terminal: Vec<&Change> =
			doc.changes.iter().filter(|c| c.status.is_terminal()).collect();
		terminal.sort_by_key(|c| std::cmp::Reverse(c.decided_at));
		terminal.truncate(terminal_cap);

		let mut out: Vec<Change> = doc
			.changes
			.iter()
			.filter(|c| c.status.is_open())
			.cloned()
			.collect();
		out.extend(terminal.into_iter().cloned());
		out.sort_by_key(|c| c.id);
		out
	}

	/// Replaces a document's changes from a restored snapshot.
	///
	/// The id counter advances past every restored id so newly recorded
	/// changes can never collide with restored ones.
	pub(crate) fn restore_document(&mut self, document: DocumentId, changes: Vec<Change>) {
		let max_id = changes.iter().map(|c| c.id.0).max().unwrap_or(0);
		self.next_id = self.next_id.max(max_id);
		self.documents.insert(document, DocumentChanges { changes });
	}

	/// Drops a document's changes entirely (document closed and forgotten).
	pub fn forget_document(&mut self, document: DocumentId) {
		self.documents.remove(&document);
	}
}

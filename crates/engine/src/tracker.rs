//! The engine facade.
//!
//! [`Tracker`] is the explicit context object hosts hold instead of a
//! global singleton: it owns the ledger, the session manager, the event
//! bus, the debounce scheduler, and the threshold configuration, and it
//! exposes every boundary operation of the core. All writes go through
//! `&mut self`, which makes the mutation and decision paths single-flight
//! per tracker by construction.

use chrono::{DateTime, Utc};
use redline_primitives::{
	Change, ChangeDraft, ChangeId, ChangeStatus, DocumentMutation, ValidationError,
};
use thiserror::Error;
use tokio::sync::broadcast;

use redline_cluster::{Cluster, ClusterConfig, ClusterError, ClusterOutcome, StrategyKind};

use crate::decision::{self, BatchOutcome, Decision};
use crate::decoration::{Decoration, decorations};
use crate::events::{EventBus, TrackEvent};
use crate::ids::{DocumentId, SessionId};
use crate::ledger::{ChangeFilter, ChangeLedger, MutationReport};
use crate::persist::{PersistError, RECENT_TERMINAL_CAP, SessionSnapshot};
use crate::scheduler::{DebounceScheduler, SignalKind};
use crate::session::{Session, SessionError, SessionManager, SessionState};
use crate::surface::EditorSurface;
use crate::threshold::{Thresholds, Trigger, evaluate};

/// What a decision batch targets.
#[derive(Debug, Clone, Copy)]
pub enum DecideTargets<'a> {
	/// Explicit change ids.
	Changes(&'a [ChangeId]),
	/// Every member of a cluster.
	Cluster(&'a Cluster),
}

impl DecideTargets<'_> {
	fn ids(&self) -> &[ChangeId] {
		match self {
			DecideTargets::Changes(ids) => ids,
			DecideTargets::Cluster(cluster) => &cluster.members,
		}
	}
}

/// Facade-level failures.
///
/// Per-item outcomes (validation of a batch item, a single reject
/// mismatch) are reported inline in the respective result types, not
/// through this enum.
#[derive(Debug, Error)]
pub enum TrackerError {
	/// The operation needs a live tracking session for the document.
	#[error("document is not being tracked")]
	NotTracking,
	/// No session record exists for the document.
	#[error("no session exists for this document")]
	UnknownDocument,
	/// A session state machine guard refused the transition.
	#[error(transparent)]
	Session(#[from] SessionError),
	/// A single-change record was refused.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// The clustering engine refused the input.
	#[error(transparent)]
	Cluster(#[from] ClusterError),
	/// A session snapshot could not be encoded or decoded.
	#[error(transparent)]
	Persist(#[from] PersistError),
	/// The snapshot belongs to a different document.
	#[error("snapshot is for {found}, not {expected}")]
	SnapshotMismatch {
		/// The document the caller asked to restore.
		expected: DocumentId,
		/// The document recorded in the snapshot.
		found: DocumentId,
	},
}

/// Owns the whole tracking core for one host.
#[derive(Debug, Default)]
pub struct Tracker {
	ledger: ChangeLedger,
	sessions: SessionManager,
	events: EventBus,
	scheduler: DebounceScheduler,
	thresholds: Thresholds,
}

impl Tracker {
	/// Creates a tracker with no thresholds configured.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a tracker with the given auto-trigger thresholds.
	pub fn with_thresholds(thresholds: Thresholds) -> Self {
		Self {
			thresholds,
			..Self::default()
		}
	}

	/// Opens a subscription to change and session notifications.
	pub fn subscribe(&self) -> broadcast::Receiver<TrackEvent> {
		self.events.subscribe()
	}

	/// Returns the session record for a document, live or ended.
	pub fn session(&self, document: DocumentId) -> Option<&Session> {
		self.sessions.session(document)
	}

	/// Returns true while the document has a live session.
	pub fn is_tracking(&self, document: DocumentId) -> bool {
		self.sessions.is_tracking(document)
	}

	/// Starts tracking a document. Idempotent for a document already
	/// tracking; `None` means the host has no focused document.
	///
	/// # Errors
	/// [`SessionError::NoActiveDocument`] without a document,
	/// [`SessionError::AlreadyTransitioning`] while another transition is
	/// in flight.
	pub fn enable(
		&mut self,
		document: Option<DocumentId>,
		now: DateTime<Utc>,
	) -> Result<SessionId, TrackerError> {
		let document = document.ok_or(SessionError::NoActiveDocument)?;
		let was_tracking = self.sessions.is_tracking(document);
		let id = self.sessions.enable(Some(document), now)?;
		if !was_tracking {
			self.events.emit(TrackEvent::SessionStateChanged {
				document,
				state: SessionState::Tracking,
			});
		}
		Ok(id)
	}

	/// Stops tracking a document, cancelling its queued debounce work.
	///
	/// Recorded changes stay in the ledger for audit; decorations disappear
	/// with the session because they are derived from the pending snapshot
	/// on demand. Returns true if a live session was ended.
	pub fn disable(
		&mut self,
		document: DocumentId,
		now: DateTime<Utc>,
	) -> Result<bool, TrackerError> {
		let ended = self.sessions.disable(document, now)?;
		if ended {
			self.scheduler.cancel_document(document);
			self.events.emit(TrackEvent::SessionStateChanged {
				document,
				state: SessionState::Inactive,
			});
		}
		Ok(ended)
	}

	/// Stops tracking `from` and starts tracking `to` as one guarded
	/// operation.
	///
	/// # Errors
	/// [`SessionError::AlreadyTransitioning`] if a transition is already in
	/// flight; nothing is applied in that case.
	pub fn switch(
		&mut self,
		from: DocumentId,
		to: Option<DocumentId>,
		now: DateTime<Utc>,
	) -> Result<SessionId, TrackerError> {
		let from_was_tracking = self.sessions.is_tracking(from);
		let to_was_tracking = to.is_some_and(|doc| self.sessions.is_tracking(doc));
		let id = self.sessions.switch(from, to, now)?;
		if from_was_tracking {
			self.scheduler.cancel_document(from);
			self.events.emit(TrackEvent::SessionStateChanged {
				document: from,
				state: SessionState::Inactive,
			});
		}
		// A switch back onto `from` itself ends one session and starts a
		// fresh one, so it still announces Tracking.
		if let Some(to) = to
			&& (to == from || !to_was_tracking)
		{
			self.events.emit(TrackEvent::SessionStateChanged {
				document: to,
				state: SessionState::Tracking,
			});
		}
		Ok(id)
	}

	/// Records one candidate change.
	///
	/// # Errors
	/// [`TrackerError::NotTracking`] when the document has no live session;
	/// the draft's [`ValidationError`] when it is malformed.
	pub fn record(
		&mut self,
		document: DocumentId,
		draft: ChangeDraft,
		now: DateTime<Utc>,
	) -> Result<ChangeId, TrackerError> {
		if !self.sessions.is_tracking(document) {
			return Err(TrackerError::NotTracking);
		}
		let id = self.ledger.record(document, draft, now)?;
		self.events.emit(TrackEvent::ChangeRecorded {
			document,
			change: id,
		});
		Ok(id)
	}

	/// Records a batch of candidate changes as one unit.
	///
	/// Items are validated independently; one malformed draft does not
	/// block the rest. The outer error fires only when the document is not
	/// being tracked at all.
	pub fn record_batch(
		&mut self,
		document: DocumentId,
		drafts: Vec<ChangeDraft>,
		now: DateTime<Utc>,
	) -> Result<Vec<Result<ChangeId, ValidationError>>, TrackerError> {
		if !self.sessions.is_tracking(document) {
			return Err(TrackerError::NotTracking);
		}
		let results = self.ledger.record_batch(document, drafts, now);
		for id in results.iter().flatten() {
			self.events.emit(TrackEvent::ChangeRecorded {
				document,
				change: *id,
			});
		}
		Ok(results)
	}

	/// Folds one committed host mutation through the position mapper.
	///
	/// Must be called once per transaction step, in arrival order, and
	/// never for edits the engine itself issued during a reject (those are
	/// folded in already). Bumps the session version while tracking.
	pub fn handle_mutation(
		&mut self,
		document: DocumentId,
		mutation: &DocumentMutation,
	) -> MutationReport {
		let report = self.ledger.apply_mutation(document, mutation);
		self.sessions.bump_version(document);
		for &id in &report.invalidated {
			self.events.emit(TrackEvent::ChangeStatusChanged {
				document,
				change: id,
				from: ChangeStatus::Pending,
				to: ChangeStatus::Invalid,
			});
		}
		report
	}

	/// Returns the changes matching a filter, in recording order.
	pub fn changes(&self, document: DocumentId, filter: &ChangeFilter) -> Vec<Change> {
		self.ledger.changes(document, filter)
	}

	/// Returns the actionable pending snapshot.
	pub fn pending(&self, document: DocumentId) -> Vec<Change> {
		self.ledger.pending(document)
	}

	/// Derives the current marker set for a document.
	pub fn decorations(&self, document: DocumentId) -> Vec<Decoration> {
		decorations(&self.ledger.pending(document))
	}

	/// Clusters the document's pending snapshot with the chosen strategy.
	///
	/// Purely derived: the result is valid until the next write to the
	/// document's changes.
	///
	/// # Errors
	/// The engine's [`ClusterError`] when the input is empty or the
	/// strategy's suitability check refuses it.
	pub fn clusters(
		&self,
		document: DocumentId,
		strategy: StrategyKind,
		config: &ClusterConfig,
	) -> Result<ClusterOutcome, TrackerError> {
		Ok(redline_cluster::cluster(
			&self.ledger.pending(document),
			strategy,
			config,
		)?)
	}

	/// Runs one accept/reject batch against the document.
	///
	/// Every target is attempted and reports its own outcome; decisions are
	/// not abortable mid-batch. Each processed change bumps the session
	/// version and emits a status notification.
	pub fn decide(
		&mut self,
		document: DocumentId,
		surface: &mut dyn EditorSurface,
		targets: DecideTargets<'_>,
		decision: Decision,
		now: DateTime<Utc>,
	) -> BatchOutcome {
		let outcome = decision::decide(
			&mut self.ledger,
			surface,
			document,
			targets.ids(),
			decision,
			now,
		);

		let to = match decision {
			Decision::Accept => ChangeStatus::Accepted,
			Decision::Reject => ChangeStatus::Rejected,
		};
		for &id in &outcome.processed {
			self.sessions.bump_version(document);
			self.events.emit(TrackEvent::ChangeStatusChanged {
				document,
				change: id,
				from: ChangeStatus::Pending,
				to,
			});
		}
		for &id in &outcome.invalidated {
			self.events.emit(TrackEvent::ChangeStatusChanged {
				document,
				change: id,
				from: ChangeStatus::Pending,
				to: ChangeStatus::Invalid,
			});
		}
		outcome
	}

	/// Evaluates the document's pending snapshot against the configured
	/// thresholds, emitting [`TrackEvent::AutoTrigger`] on fire.
	pub fn check_thresholds(&mut self, document: DocumentId, now: DateTime<Utc>) -> Trigger {
		let trigger = evaluate(&self.ledger.pending(document), &self.thresholds, now);
		if let Some(reason) = trigger.reason {
			tracing::debug!(%document, reason = ?reason, "threshold.fire");
			self.events.emit(TrackEvent::AutoTrigger { document, reason });
		}
		trigger
	}

	/// The configured auto-trigger thresholds.
	pub fn thresholds(&self) -> &Thresholds {
		&self.thresholds
	}

	/// Replaces the auto-trigger thresholds.
	pub fn set_thresholds(&mut self, thresholds: Thresholds) {
		self.thresholds = thresholds;
	}

	/// Arms (or re-arms) a named debounce timer for a document.
	///
	/// Must be called from within a tokio runtime. Disabling the session
	/// cancels whatever is still queued.
	pub fn debounce(
		&mut self,
		document: DocumentId,
		kind: SignalKind,
		delay: std::time::Duration,
		action: impl FnOnce() + Send + 'static,
	) {
		self.scheduler.debounce(document, kind, delay, action);
	}

	/// The debounce scheduler's counters, for hosts and tests.
	pub fn scheduler(&self) -> &DebounceScheduler {
		&self.scheduler
	}

	/// Serializes a document's tracking state to compact bytes.
	///
	/// The snapshot covers the session record (version counter included),
	/// every open change, and the newest terminal changes as an audit tail.
	///
	/// # Errors
	/// [`TrackerError::UnknownDocument`] when no session record exists.
	pub fn serialize_session(&self, document: DocumentId) -> Result<Vec<u8>, TrackerError> {
		let session = self
			.sessions
			.session(document)
			.ok_or(TrackerError::UnknownDocument)?;
		let snapshot = SessionSnapshot {
			session: session.clone(),
			changes: self.ledger.snapshot_changes(document, RECENT_TERMINAL_CAP),
		};
		Ok(snapshot.to_bytes()?)
	}

	/// Restores a document's tracking state from serialized bytes.
	///
	/// Replaces any state the tracker already holds for the document.
	///
	/// # Errors
	/// [`PersistError::Decode`] for malformed bytes;
	/// [`TrackerError::SnapshotMismatch`] when the snapshot was taken for a
	/// different document.
	pub fn restore_session(
		&mut self,
		document: DocumentId,
		bytes: &[u8],
	) -> Result<Session, TrackerError> {
		let snapshot = SessionSnapshot::from_bytes(bytes)?;
		if snapshot.session.document != document {
			return Err(TrackerError::SnapshotMismatch {
				expected: document,
				found: snapshot.session.document,
			});
		}
		let session = snapshot.session.clone();
		tracing::debug!(
			%document,
			id = %session.id,
			version = session.version,
			changes = snapshot.changes.len(),
			"session.restore"
		);
		self.sessions.restore(snapshot.session);
		self.ledger.restore_document(document, snapshot.changes);
		if session.state == SessionState::Tracking {
			self.events.emit(TrackEvent::SessionStateChanged {
				document,
				state: SessionState::Tracking,
			});
		}
		Ok(session)
	}
}

//! Tracking session state machine.
//!
//! Goals:
//! - exactly one live session per document (enable is idempotent)
//! - at most one transition in flight per manager, ever — a second
//!   enable/disable/switch arriving mid-transition is a hard error, the
//!   guard that prevents runaway restart loops
//! - disabled sessions are kept, with `ended_at` set, for audit

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{DocumentId, SessionId};

/// Whether a session is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
	/// Not tracking; terminal for this session record.
	Inactive,
	/// Recording changes for its document.
	Tracking,
}

/// Tracking scope for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
	/// Stable identity across the manager's lifetime.
	pub id: SessionId,
	/// The tracked document.
	pub document: DocumentId,
	/// Live or ended.
	pub state: SessionState,
	/// When tracking started.
	pub started_at: DateTime<Utc>,
	/// When tracking ended, once inactive.
	pub ended_at: Option<DateTime<Utc>>,
	/// Bumped on every committed mutation and successful decision, for
	/// optimistic consistency checks.
	pub version: u64,
}

/// Session state machine violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
	/// Enable was called without a document to attach to.
	#[error("no active document to track")]
	NoActiveDocument,
	/// A transition was requested while another is in flight.
	#[error("a session transition is already in flight")]
	AlreadyTransitioning,
}

/// Owns every session and serializes their transitions.
#[derive(Debug, Default)]
pub struct SessionManager {
	sessions: FxHashMap<DocumentId, Session>,
	next_id: u64,
	transitioning: bool,
	starts: u64,
	stops: u64,
}

impl SessionManager {
	/// Creates an empty manager.
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts tracking a document.
	///
	/// Idempotent: a document already tracking returns its live session id
	/// and no second session is created. `None` means the host has no
	/// focused document and is refused.
	pub fn enable(
		&mut self,
		document: Option<DocumentId>,
		now: DateTime<Utc>,
	) -> Result<SessionId, SessionError> {
		let document = document.ok_or(SessionError::NoActiveDocument)?;
		self.guarded(|mgr| Ok(mgr.enable_unguarded(document, now)))
	}

	/// Stops tracking a document.
	///
	/// Returns true if a live session was ended. Disabling an untracked
	/// document is a no-op, not an error.
	pub fn disable(
		&mut self,
		document: DocumentId,
		now: DateTime<Utc>,
	) -> Result<bool, SessionError> {
		self.guarded(|mgr| Ok(mgr.disable_unguarded(document, now)))
	}

	/// Stops tracking `from` and starts tracking `to` as one guarded
	/// operation.
	///
	/// The guard is held across both halves, so a second switch arriving
	/// mid-flight fails with [`SessionError::AlreadyTransitioning`] and
	/// applies nothing. A missing target is refused before `from` is
	/// touched: a guard violation never partially applies.
	pub fn switch(
		&mut self,
		from: DocumentId,
		to: Option<DocumentId>,
		now: DateTime<Utc>,
	) -> Result<SessionId, SessionError> {
		let to = to.ok_or(SessionError::NoActiveDocument)?;
		self.guarded(|mgr| {
			mgr.disable_unguarded(from, now);
			Ok(mgr.enable_unguarded(to, now))
		})
	}

	/// Runs one transition under the single-flight guard.
	fn guarded<T>(
		&mut self,
		op: impl FnOnce(&mut Self) -> Result<T, SessionError>,
	) -> Result<T, SessionError> {
		if self.transitioning {
			return Err(SessionError::AlreadyTransitioning);
		}
		self.transitioning = true;
		let result = op(self);
		self.transitioning = false;
		result
	}

	fn enable_unguarded(&mut self, document: DocumentId, now: DateTime<Utc>) -> SessionId {
		if let Some(session) = self.sessions.get(&document)
			&& session.state == SessionState::Tracking
		{
			tracing::trace!(%document, id = %session.id, "session.enable.noop");
			return session.id;
		}

		self.next_id += 1;
		let id = SessionId(self.next_id);
		self.sessions.insert(
			document,
			Session {
				id,
				document,
				state: SessionState::Tracking,
				started_at: now,
				ended_at: None,
				version: 0,
			},
		);
		self.starts += 1;
		tracing::debug!(%document, %id, "session.enable");
		id
	}

	fn disable_unguarded(&mut self, document: DocumentId, now: DateTime<Utc>) -> bool {
		let Some(session) = self.sessions.get_mut(&document) else {
			return false;
		};
		if session.state != SessionState::Tracking {
			return false;
		}
		session.state = SessionState::Inactive;
		session.ended_at = Some(now);
		self.stops += 1;
		tracing::debug!(%document, id = %session.id, version = session.version, "session.disable");
		true
	}

	/// Returns the session record for a document, live or ended.
	pub fn session(&self, document: DocumentId) -> Option<&Session> {
		self.sessions.get(&document)
	}

	/// Returns true while the document has a live session.
	pub fn is_tracking(&self, document: DocumentId) -> bool {
		self.sessions
			.get(&document)
			.is_some_and(|s| s.state == SessionState::Tracking)
	}

	/// Bumps the optimistic version of a live session.
	pub(crate) fn bump_version(&mut self, document: DocumentId) {
		if let Some(session) = self.sessions.get_mut(&document)
			&& session.state == SessionState::Tracking
		{
			session.version += 1;
		}
	}

	/// Installs a restored session record, replacing any existing one.
	pub(crate) fn restore(&mut self, session: Session) {
		self.next_id = self.next_id.max(session.id.0);
		if session.state == SessionState::Tracking {
			self.starts += 1;
		}
		self.sessions.insert(session.document, session);
	}

	/// Total session starts since construction.
	pub fn starts(&self) -> u64 {
		self.starts
	}

	/// Total session stops since construction.
	pub fn stops(&self) -> u64 {
		self.stops
	}
}

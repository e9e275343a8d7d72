//! Session snapshot serialization.
//!
//! Tracking state survives process restarts as compact postcard bytes:
//! the session record (including its version counter), every open change,
//! and a capped tail of recently-terminal changes for audit.

use redline_primitives::Change;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::Session;

/// How many terminal changes a snapshot keeps, newest first.
pub const RECENT_TERMINAL_CAP: usize = 64;

/// Everything needed to resume tracking a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
	/// The session record, version counter included.
	pub session: Session,
	/// Open changes plus the recent terminal tail.
	pub changes: Vec<Change>,
}

/// Snapshot encode/decode failures.
#[derive(Debug, Error)]
pub enum PersistError {
	/// The snapshot could not be encoded.
	#[error("failed to encode session snapshot: {0}")]
	Encode(postcard::Error),
	/// The bytes are not a valid snapshot.
	#[error("failed to decode session snapshot: {0}")]
	Decode(postcard::Error),
}

impl SessionSnapshot {
	/// Encodes the snapshot to bytes.
	pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
		postcard::to_allocvec(self).map_err(PersistError::Encode)
	}

	/// Decodes a snapshot from bytes.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
		postcard::from_bytes(bytes).map_err(PersistError::Decode)
	}
}

//! Event notifications for the review-UI boundary.
//!
//! Components inside the engine call each other through typed interfaces;
//! asynchronous notification is reserved for this one subscription edge.
//! Sends are best-effort: a lagging or absent subscriber never blocks the
//! core.

use redline_primitives::{ChangeId, ChangeStatus};
use tokio::sync::broadcast;

use crate::ids::DocumentId;
use crate::session::SessionState;
use crate::threshold::TriggerReason;

/// Default buffered event capacity per subscriber.
const EVENT_CAPACITY: usize = 256;

/// A state transition the review UI can subscribe to.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEvent {
	/// A change entered the ledger as pending.
	ChangeRecorded {
		/// Owning document.
		document: DocumentId,
		/// The new change.
		change: ChangeId,
	},
	/// A change moved between lifecycle states.
	ChangeStatusChanged {
		/// Owning document.
		document: DocumentId,
		/// The affected change.
		change: ChangeId,
		/// Previous status.
		from: ChangeStatus,
		/// New status.
		to: ChangeStatus,
	},
	/// A tracking session started or stopped.
	SessionStateChanged {
		/// Owning document.
		document: DocumentId,
		/// New session state.
		state: SessionState,
	},
	/// A configured threshold fired for the document's pending set.
	AutoTrigger {
		/// Owning document.
		document: DocumentId,
		/// Which threshold fired.
		reason: TriggerReason,
	},
}

/// Broadcast fan-out for [`TrackEvent`]s.
#[derive(Debug)]
pub struct EventBus {
	tx: broadcast::Sender<TrackEvent>,
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(EVENT_CAPACITY)
	}
}

impl EventBus {
	/// Creates a bus with the given per-subscriber capacity.
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity);
		Self { tx }
	}

	/// Opens a new subscription; events sent before this call are not
	/// replayed.
	pub fn subscribe(&self) -> broadcast::Receiver<TrackEvent> {
		self.tx.subscribe()
	}

	/// Emits an event to all current subscribers, if any.
	pub fn emit(&self, event: TrackEvent) {
		// No subscribers is the common headless case, not an error.
		let _ = self.tx.send(event);
	}
}

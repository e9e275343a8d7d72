//! Track-edits engine: ledger, sessions, batch decisions, and thresholds.
//!
//! The engine records incremental edits to a live document, keeps their
//! spans valid while the document keeps mutating, and accepts or rejects
//! them in safe batches. Hosts drive it through [`Tracker`] — an explicit
//! context object, never a global — and implement [`EditorSurface`] for
//! their document buffer.

/// Batch accept/reject processing.
pub mod decision;
/// Transient visual markers derived from pending changes.
pub mod decoration;
/// Event notifications for the review-UI boundary.
pub mod events;
/// Document and session identifiers.
pub mod ids;
/// The change ledger and position mapping.
pub mod ledger;
/// Session snapshot serialization.
pub mod persist;
/// Debounced signal coalescing.
pub mod scheduler;
/// Tracking session state machine.
pub mod session;
/// The editor surface boundary.
pub mod surface;
/// Automatic batch-action thresholds.
pub mod threshold;
/// The engine facade.
pub mod tracker;

pub use decision::{
	BatchOutcome, Decision, DecisionError, FailedItem, SkipReason, SkippedItem,
};
pub use decoration::{Decoration, DecorationKind, decorations};
pub use events::{EventBus, TrackEvent};
pub use ids::{DocumentId, SessionId};
pub use ledger::{ChangeFilter, ChangeLedger, MutationReport};
pub use persist::{PersistError, SessionSnapshot};
pub use scheduler::{DebounceScheduler, SignalKind};
pub use session::{Session, SessionError, SessionManager, SessionState};
pub use surface::{EditorSurface, MemorySurface, SurfaceEdit};
pub use threshold::{Thresholds, Trigger, TriggerReason};
pub use tracker::{DecideTargets, Tracker, TrackerError};

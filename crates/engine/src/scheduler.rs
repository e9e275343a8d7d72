//! Debounced signal coalescing.
//!
//! One explicit scheduler for the engine's delayed work — "document
//! mutated" and "save" signals — instead of ad-hoc timers at call sites.
//! Timers are named by `(document, signal)`: re-arming a named timer
//! cancels the pending one, and disabling a session cancels everything the
//! document still has queued.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ids::DocumentId;

/// Kind of delayed signal being coalesced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
	/// Document content changed; clustering/threshold work may follow.
	Mutated,
	/// Tracking state should be flushed to the persistence store.
	Save,
}

/// Coalescing debounce timers keyed by `(document, signal)`.
///
/// Spawns onto the ambient tokio runtime; `debounce` must be called from
/// within one.
#[derive(Debug, Default)]
pub struct DebounceScheduler {
	pending: HashMap<(DocumentId, SignalKind), CancellationToken>,
	scheduled_total: u64,
	coalesced_total: u64,
	fired_total: Arc<AtomicU64>,
}

impl DebounceScheduler {
	/// Creates an empty scheduler.
	pub fn new() -> Self {
		Self::default()
	}

	/// Arms (or re-arms) the named timer.
	///
	/// A pending timer with the same name is cancelled and replaced; the
	/// action runs once the delay elapses without another re-arm.
	pub fn debounce(
		&mut self,
		document: DocumentId,
		kind: SignalKind,
		delay: Duration,
		action: impl FnOnce() + Send + 'static,
	) {
		let token = CancellationToken::new();
		if let Some(previous) = self.pending.insert((document, kind), token.clone()) {
			previous.cancel();
			self.coalesced_total += 1;
		}
		self.scheduled_total += 1;
		tracing::trace!(%document, kind = ?kind, delay_ms = delay.as_millis() as u64, "debounce.arm");

		let fired = self.fired_total.clone();
		tokio::spawn(async move {
			tokio::select! {
				_ = token.cancelled() => {}
				_ = tokio::time::sleep(delay) => {
					fired.fetch_add(1, Ordering::Relaxed);
					action();
				}
			}
		});
	}

	/// Cancels one named timer. Returns true if one was pending.
	pub fn cancel(&mut self, document: DocumentId, kind: SignalKind) -> bool {
		match self.pending.remove(&(document, kind)) {
			Some(token) => {
				token.cancel();
				tracing::trace!(%document, kind = ?kind, "debounce.cancel");
				true
			}
			None => false,
		}
	}

	/// Cancels every timer a document still has queued.
	///
	/// Returns the number of cancelled timers.
	pub fn cancel_document(&mut self, document: DocumentId) -> usize {
		let keys: Vec<_> = self
			.pending
			.keys()
			.filter(|(doc, _)| *doc == document)
			.copied()
			.collect();
		for key in &keys {
			if let Some(token) = self.pending.remove(key) {
				token.cancel();
			}
		}
		if !keys.is_empty() {
			tracing::debug!(%document, count = keys.len(), "debounce.cancel_document");
		}
		keys.len()
	}

	/// Total timers armed.
	pub fn scheduled_total(&self) -> u64 {
		self.scheduled_total
	}

	/// Timers replaced by a re-arm before firing.
	pub fn coalesced_total(&self) -> u64 {
		self.coalesced_total
	}

	/// Timers whose action ran.
	pub fn fired_total(&self) -> u64 {
		self.fired_total.load(Ordering::Relaxed)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;

	use super::*;

	const DOC: DocumentId = DocumentId(1);

	#[tokio::test(start_paused = true)]
	async fn test_fires_after_delay() {
		let mut scheduler = DebounceScheduler::new();
		let hits = Arc::new(AtomicUsize::new(0));

		let h = hits.clone();
		scheduler.debounce(DOC, SignalKind::Mutated, Duration::from_millis(50), move || {
			h.fetch_add(1, Ordering::SeqCst);
		});

		tokio::time::sleep(Duration::from_millis(60)).await;
		tokio::task::yield_now().await;
		assert_eq!(hits.load(Ordering::SeqCst), 1);
		assert_eq!(scheduler.fired_total(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_rearm_coalesces() {
		let mut scheduler = DebounceScheduler::new();
		let hits = Arc::new(AtomicUsize::new(0));

		for _ in 0..3 {
			let h = hits.clone();
			scheduler.debounce(DOC, SignalKind::Save, Duration::from_millis(50), move || {
				h.fetch_add(1, Ordering::SeqCst);
			});
			tokio::time::sleep(Duration::from_millis(10)).await;
		}

		tokio::time::sleep(Duration::from_millis(100)).await;
		tokio::task::yield_now().await;
		assert_eq!(hits.load(Ordering::SeqCst), 1);
		assert_eq!(scheduler.coalesced_total(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancel_document_stops_all_signals() {
		let mut scheduler = DebounceScheduler::new();
		let hits = Arc::new(AtomicUsize::new(0));

		for kind in [SignalKind::Mutated, SignalKind::Save] {
			let h = hits.clone();
			scheduler.debounce(DOC, kind, Duration::from_millis(50), move || {
				h.fetch_add(1, Ordering::SeqCst);
			});
		}
		assert_eq!(scheduler.cancel_document(DOC), 2);

		tokio::time::sleep(Duration::from_millis(100)).await;
		tokio::task::yield_now().await;
		assert_eq!(hits.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_independent_documents_do_not_interfere() {
		let mut scheduler = DebounceScheduler::new();
		let hits = Arc::new(AtomicUsize::new(0));

		for doc in [DocumentId(1), DocumentId(2)] {
			let h = hits.clone();
			scheduler.debounce(doc, SignalKind::Mutated, Duration::from_millis(50), move || {
				h.fetch_add(1, Ordering::SeqCst);
			});
		}
		scheduler.cancel_document(DocumentId(1));

		tokio::time::sleep(Duration::from_millis(100)).await;
		tokio::task::yield_now().await;
		assert_eq!(hits.load(Ordering::SeqCst), 1);
	}
}

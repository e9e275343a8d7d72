//! Automatic batch-action thresholds.
//!
//! Watches an accumulating pending set and says *when* an automatic batch
//! action should fire; *what* to do on fire — auto-accept, surface for
//! review — is the caller's policy, not this module's.

use chrono::{DateTime, Duration, Utc};
use redline_primitives::Change;
use serde::{Deserialize, Serialize};

/// Trigger configuration. An unset field never fires.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thresholds {
	/// Fire once this many changes are pending.
	pub change_count: Option<usize>,
	/// Fire once the summed confidence of pending changes reaches this.
	pub confidence_sum: Option<f64>,
	/// Fire once the oldest pending change is at least this old.
	pub time_window: Option<Duration>,
}

/// Which threshold fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerReason {
	/// The pending count reached `change_count`.
	CountReached,
	/// Summed confidence reached `confidence_sum`.
	ConfidenceReached,
	/// The oldest pending change aged past `time_window`.
	WindowElapsed,
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
	/// True when any configured threshold is met.
	pub should_fire: bool,
	/// The first threshold that fired, in count/confidence/window order.
	pub reason: Option<TriggerReason>,
}

impl Trigger {
	const QUIET: Trigger = Trigger {
		should_fire: false,
		reason: None,
	};

	fn fired(reason: TriggerReason) -> Trigger {
		Trigger {
			should_fire: true,
			reason: Some(reason),
		}
	}
}

/// Evaluates a pending snapshot against the thresholds.
///
/// Only actionable pending changes count; `Invalid` changes are not
/// reviewable and never push a trigger over the line.
pub fn evaluate(pending: &[Change], thresholds: &Thresholds, now: DateTime<Utc>) -> Trigger {
	let actionable: Vec<&Change> = pending
		.iter()
		.filter(|c| c.status.is_actionable())
		.collect();
	if actionable.is_empty() {
		return Trigger::QUIET;
	}

	if let Some(count) = thresholds.change_count
		&& actionable.len() >= count
	{
		return Trigger::fired(TriggerReason::CountReached);
	}
	if let Some(target) = thresholds.confidence_sum {
		let sum: f64 = actionable.iter().map(|c| c.source.confidence).sum();
		if sum >= target {
			return Trigger::fired(TriggerReason::ConfidenceReached);
		}
	}
	if let Some(window) = thresholds.time_window {
		let oldest = actionable
			.iter()
			.map(|c| c.recorded_at)
			.min()
			.unwrap_or(now);
		if now - oldest >= window {
			return Trigger::fired(TriggerReason::WindowElapsed);
		}
	}
	Trigger::QUIET
}

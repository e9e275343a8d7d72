//! End-to-end tracking scenarios driven through the facade.

use chrono::{DateTime, TimeZone, Utc};
use redline_cluster::{ClusterConfig, StrategyKind};
use redline_engine::{
	ChangeFilter, DecideTargets, Decision, DecisionError, DocumentId, MemorySurface, SessionError,
	SessionState, Thresholds, TrackEvent, Tracker, TrackerError, TriggerReason,
};
use redline_primitives::{ChangeDraft, ChangeSource, ChangeStatus, SourceKind, Span};

const DOC: DocumentId = DocumentId(1);
const OTHER: DocumentId = DocumentId(2);

fn at(secs: i64) -> DateTime<Utc> {
	Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn ai(confidence: f64) -> ChangeSource {
	ChangeSource::new(SourceKind::Ai, "model-a", confidence)
}

#[test]
fn test_reject_insert_with_matching_text_reverts_document() {
	let mut tracker = Tracker::new();
	let mut surface = MemorySurface::from_text("0123456789hello rest");
	tracker.enable(Some(DOC), at(0)).unwrap();

	let id = tracker
		.record(DOC, ChangeDraft::insert(10, "hello", ai(0.9), "style"), at(1))
		.unwrap();
	assert_eq!(tracker.decorations(DOC).len(), 1);

	let outcome = tracker.decide(
		DOC,
		&mut surface,
		DecideTargets::Changes(&[id]),
		Decision::Reject,
		at(2),
	);
	assert_eq!(outcome.processed, vec![id]);
	assert_eq!(surface.text(), "0123456789 rest");
	let rejected = tracker.changes(DOC, &ChangeFilter::default());
	assert_eq!(rejected[0].status, ChangeStatus::Rejected);
	assert!(tracker.decorations(DOC).is_empty());
	assert_eq!(tracker.session(DOC).unwrap().version, 1);
}

#[test]
fn test_reject_diverged_text_leaves_document_and_status_alone() {
	let mut tracker = Tracker::new();
	let mut surface = MemorySurface::from_text("0123456789hello rest");
	tracker.enable(Some(DOC), at(0)).unwrap();
	let id = tracker
		.record(DOC, ChangeDraft::insert(10, "hello", ai(0.9), "style"), at(1))
		.unwrap();

	// The user types inside the inserted text and the host never reports
	// it: the tracker still expects "hello" at [10, 15) while the document
	// now holds "help!".
	surface.splice(Span::new(13, 14), "p!");

	let outcome = tracker.decide(
		DOC,
		&mut surface,
		DecideTargets::Changes(&[id]),
		Decision::Reject,
		at(3),
	);
	assert!(outcome.processed.is_empty());
	assert!(matches!(
		outcome.failed[0].error,
		DecisionError::TextMismatch { .. }
	));
	assert_eq!(surface.text(), "0123456789help!o rest");
	assert_eq!(tracker.pending(DOC)[0].status, ChangeStatus::Pending);
}

#[test]
fn test_accept_twice_is_noop_not_error() {
	let mut tracker = Tracker::new();
	let mut surface = MemorySurface::from_text("hello");
	tracker.enable(Some(DOC), at(0)).unwrap();
	let id = tracker
		.record(DOC, ChangeDraft::insert(0, "hello", ai(0.8), "style"), at(1))
		.unwrap();

	let first = tracker.decide(
		DOC,
		&mut surface,
		DecideTargets::Changes(&[id]),
		Decision::Accept,
		at(2),
	);
	assert_eq!(first.processed, vec![id]);

	let second = tracker.decide(
		DOC,
		&mut surface,
		DecideTargets::Changes(&[id]),
		Decision::Accept,
		at(3),
	);
	assert!(second.processed.is_empty());
	assert!(second.failed.is_empty());
	assert_eq!(second.skipped.len(), 1);
}

#[test]
fn test_mutations_keep_pending_spans_in_bounds() {
	let mut tracker = Tracker::new();
	let mut surface = MemorySurface::from_text("aaaa hello bbbb");
	tracker.enable(Some(DOC), at(0)).unwrap();
	tracker
		.record(DOC, ChangeDraft::insert(5, "hello", ai(0.9), "style"), at(1))
		.unwrap();

	// Edits before, after, and inside the tracked span.
	for (span, text) in [
		(Span::new(0, 2), ""),
		(Span::new(11, 12), "xyz"),
		(Span::new(4, 5), ""),
	] {
		let mutation = surface.splice(span, text);
		tracker.handle_mutation(DOC, &mutation);
		let len = surface.text().chars().count();
		for change in tracker.pending(DOC) {
			assert!(change.span.start <= change.span.end);
			assert!(change.span.end <= len);
		}
	}
	// The last edit truncated the tracked text, so nothing stays pending.
	assert!(tracker.pending(DOC).is_empty());
	let invalid = tracker.changes(
		DOC,
		&ChangeFilter {
			status: Some(ChangeStatus::Invalid),
			..Default::default()
		},
	);
	assert_eq!(invalid.len(), 1);
}

#[test]
fn test_record_requires_live_session() {
	let mut tracker = Tracker::new();
	let err = tracker
		.record(DOC, ChangeDraft::insert(0, "x", ai(0.5), "style"), at(0))
		.unwrap_err();
	assert!(matches!(err, TrackerError::NotTracking));

	let err = tracker.enable(None, at(0)).unwrap_err();
	assert!(matches!(
		err,
		TrackerError::Session(SessionError::NoActiveDocument)
	));
}

#[test]
fn test_record_batch_partial_success() {
	let mut tracker = Tracker::new();
	tracker.enable(Some(DOC), at(0)).unwrap();

	let mut bad = ChangeDraft::insert(0, "x", ai(0.5), "style");
	bad.source.confidence = 7.0;
	let results = tracker
		.record_batch(
			DOC,
			vec![
				ChangeDraft::insert(0, "one", ai(0.5), "style"),
				bad,
				ChangeDraft::insert(10, "two", ai(0.6), "grammar"),
			],
			at(1),
		)
		.unwrap();
	assert!(results[0].is_ok());
	assert!(results[1].is_err());
	assert!(results[2].is_ok());
	assert_eq!(tracker.pending(DOC).len(), 2);
}

#[test]
fn test_enable_twice_yields_one_session() {
	let mut tracker = Tracker::new();
	let first = tracker.enable(Some(DOC), at(0)).unwrap();
	let second = tracker.enable(Some(DOC), at(5)).unwrap();
	assert_eq!(first, second);
	assert_eq!(tracker.session(DOC).unwrap().id, first);
}

#[test]
fn test_switch_storm_balances_starts_and_stops() {
	let mut tracker = Tracker::new();
	tracker.enable(Some(DOC), at(0)).unwrap();

	let mut rx = tracker.subscribe();
	let docs = [OTHER, DOC, OTHER, DocumentId(3), DOC];
	let mut from = DOC;
	for (i, &to) in docs.iter().enumerate() {
		tracker.switch(from, Some(to), at(1 + i as i64)).unwrap();
		from = to;
	}

	let mut starts = 0;
	let mut stops = 0;
	while let Ok(event) = rx.try_recv() {
		match event {
			TrackEvent::SessionStateChanged {
				state: SessionState::Tracking,
				..
			} => starts += 1,
			TrackEvent::SessionStateChanged {
				state: SessionState::Inactive,
				..
			} => stops += 1,
			_ => {}
		}
	}
	assert!(starts <= stops + 1, "{starts} starts vs {stops} stops");
}

#[test]
fn test_cluster_reject_is_atomic_in_attempt_not_outcome() {
	let mut tracker = Tracker::new();
	let mut surface = MemorySurface::from_text("AAbbbbCCddddEE");
	tracker.enable(Some(DOC), at(0)).unwrap();
	tracker
		.record(DOC, ChangeDraft::insert(2, "bbbb", ai(0.9), "style"), at(1))
		.unwrap();
	tracker
		.record(DOC, ChangeDraft::insert(8, "dddd", ai(0.4), "style"), at(2))
		.unwrap();

	let outcome = tracker
		.clusters(DOC, StrategyKind::Category, &ClusterConfig::default())
		.unwrap();
	assert_eq!(outcome.clusters.len(), 1);
	let cluster = outcome.clusters[0].clone();
	assert_eq!(cluster.members.len(), 2);

	// An edit lands inside the second insert before the cluster is
	// decided; the overlap invalidates it while the first stays clean.
	let mutation = surface.splice(Span::new(9, 10), "X");
	tracker.handle_mutation(DOC, &mutation);

	let batch = tracker.decide(
		DOC,
		&mut surface,
		DecideTargets::Cluster(&cluster),
		Decision::Reject,
		at(4),
	);
	assert_eq!(batch.processed.len(), 1);
	assert_eq!(batch.failed.len(), 1);
	assert!(matches!(batch.failed[0].error, DecisionError::InvalidChange));
	assert_eq!(surface.text(), "AACCdXddEE");
}

#[test]
fn test_category_clustering_partitions_pending_set() {
	let mut tracker = Tracker::new();
	tracker.enable(Some(DOC), at(0)).unwrap();
	let categories = ["grammar", "style", "grammar", "structure", "style"];
	for (i, category) in categories.iter().enumerate() {
		tracker
			.record(
				DOC,
				ChangeDraft::insert(i * 20, "txt", ai(0.5), *category),
				at(i as i64),
			)
			.unwrap();
	}

	let outcome = tracker
		.clusters(DOC, StrategyKind::Category, &ClusterConfig::default())
		.unwrap();
	assert_eq!(outcome.clusters.len(), 3);
	let total: usize = outcome.clusters.iter().map(|c| c.members.len()).sum();
	assert_eq!(total, 5);
}

#[test]
fn test_threshold_triggers_on_third_pending_change() {
	let mut tracker = Tracker::with_thresholds(Thresholds {
		change_count: Some(3),
		..Default::default()
	});
	tracker.enable(Some(DOC), at(0)).unwrap();
	let mut rx = tracker.subscribe();

	for i in 0..3u64 {
		tracker
			.record(
				DOC,
				ChangeDraft::insert(i as usize * 10, "txt", ai(0.5), "style"),
				at(i as i64),
			)
			.unwrap();
		let trigger = tracker.check_thresholds(DOC, at(i as i64));
		assert_eq!(trigger.should_fire, i == 2, "at change {}", i + 1);
	}

	let fired: Vec<TrackEvent> = std::iter::from_fn(|| rx.try_recv().ok())
		.filter(|e| matches!(e, TrackEvent::AutoTrigger { .. }))
		.collect();
	assert_eq!(
		fired,
		vec![TrackEvent::AutoTrigger {
			document: DOC,
			reason: TriggerReason::CountReached,
		}]
	);
}

#[test]
fn test_serialize_restore_round_trip() {
	let mut tracker = Tracker::new();
	let mut surface = MemorySurface::from_text("keep drop");
	tracker.enable(Some(DOC), at(0)).unwrap();
	let keep = tracker
		.record(DOC, ChangeDraft::insert(0, "keep", ai(0.9), "style"), at(1))
		.unwrap();
	let decided = tracker
		.record(DOC, ChangeDraft::insert(5, "drop", ai(0.3), "style"), at(2))
		.unwrap();
	tracker.decide(
		DOC,
		&mut surface,
		DecideTargets::Changes(&[decided]),
		Decision::Accept,
		at(3),
	);
	let version = tracker.session(DOC).unwrap().version;

	let bytes = tracker.serialize_session(DOC).unwrap();

	let mut restored = Tracker::new();
	let session = restored.restore_session(DOC, &bytes).unwrap();
	assert_eq!(session.version, version);
	assert!(restored.is_tracking(DOC));
	assert_eq!(restored.pending(DOC).len(), 1);
	assert_eq!(restored.pending(DOC)[0].id, keep);
	let accepted = restored.changes(
		DOC,
		&ChangeFilter {
			status: Some(ChangeStatus::Accepted),
			..Default::default()
		},
	);
	assert_eq!(accepted.len(), 1);

	// Ids keep advancing past the restored ones.
	let fresh = restored
		.record(DOC, ChangeDraft::insert(9, "new", ai(0.5), "style"), at(9))
		.unwrap();
	assert!(fresh > decided);
}

#[test]
fn test_restore_refuses_foreign_snapshot() {
	let mut tracker = Tracker::new();
	tracker.enable(Some(DOC), at(0)).unwrap();
	let bytes = tracker.serialize_session(DOC).unwrap();

	let err = tracker.restore_session(OTHER, &bytes).unwrap_err();
	assert!(matches!(err, TrackerError::SnapshotMismatch { .. }));
}

use chrono::{TimeZone, Utc};
use redline_primitives::{
	Change, ChangeDraft, ChangeId, ChangeSource, ChangeStatus, SourceKind,
};

use super::*;
use crate::config::ClusterConfig;

fn change(id: u64, at: usize, category: &str, kind: SourceKind, confidence: f64) -> Change {
	let draft = ChangeDraft::insert(at, "ab", ChangeSource::new(kind, "m", confidence), category);
	Change {
		id: ChangeId(id),
		kind: draft.kind,
		span: draft.span,
		content: draft.content,
		source: draft.source,
		category: draft.category,
		status: ChangeStatus::Pending,
		recorded_at: Utc.timestamp_opt(1_700_000_000 + id as i64, 0).unwrap(),
		decided_at: None,
	}
}

fn diverse_batch() -> Vec<Change> {
	vec![
		change(1, 0, "grammar", SourceKind::Ai, 0.95),
		change(2, 10, "grammar", SourceKind::Ai, 0.9),
		change(3, 300, "style", SourceKind::User, 0.5),
		change(4, 320, "style", SourceKind::User, 0.55),
		change(5, 700, "structure", SourceKind::Ai, 0.3),
		change(6, 720, "structure", SourceKind::System, 0.35),
	]
}

#[test]
fn test_category_yields_one_cluster_per_distinct_value() {
	let changes = diverse_batch();
	let outcome = cluster(&changes, StrategyKind::Category, &ClusterConfig::default()).unwrap();
	assert_eq!(outcome.clusters.len(), 3);

	let mut members: Vec<ChangeId> = outcome
		.clusters
		.iter()
		.flat_map(|c| c.members.iter().copied())
		.collect();
	members.sort();
	assert_eq!(members, (1..=6).map(ChangeId).collect::<Vec<_>>());
	assert!(outcome.clusters.iter().all(|c| !c.members.is_empty()));
}

#[test]
fn test_kmeans_k1_holds_all_inputs() {
	let changes = diverse_batch();
	let mut config = ClusterConfig::default();
	config.kmeans.k = 1;
	let outcome = cluster(&changes, StrategyKind::KMeans, &config).unwrap();
	assert_eq!(outcome.clusters.len(), 1);
	assert_eq!(outcome.clusters[0].members.len(), changes.len());
	assert!((outcome.metadata.efficiency - 1.0).abs() < 1e-12);
}

#[test]
fn test_seeded_runs_are_reproducible() {
	let changes = diverse_batch();
	let config = ClusterConfig::default();
	for strategy in [StrategyKind::KMeans, StrategyKind::Spectral, StrategyKind::Hierarchical] {
		let a = cluster(&changes, strategy, &config).unwrap();
		let b = cluster(&changes, strategy, &config).unwrap();
		assert_eq!(a, b, "{strategy:?} not reproducible");
	}
}

#[test]
fn test_ml_refuses_small_input() {
	let changes = vec![
		change(1, 0, "grammar", SourceKind::Ai, 0.9),
		change(2, 10, "style", SourceKind::User, 0.4),
	];
	let err = cluster(&changes, StrategyKind::KMeans, &ClusterConfig::default()).unwrap_err();
	assert!(matches!(err, ClusterError::Unsupported { strategy: StrategyKind::KMeans, .. }));
	// The simple strategies still work on the same input.
	assert!(cluster(&changes, StrategyKind::Proximity, &ClusterConfig::default()).is_ok());
}

#[test]
fn test_ml_refuses_flat_confidence() {
	let changes: Vec<Change> = (0..6)
		.map(|i| {
			change(
				i,
				i as usize * 40,
				if i % 2 == 0 { "grammar" } else { "style" },
				SourceKind::Ai,
				0.8,
			)
		})
		.collect();
	let err = cluster(&changes, StrategyKind::Dbscan, &ClusterConfig::default()).unwrap_err();
	assert!(matches!(err, ClusterError::Unsupported { .. }));
}

#[test]
fn test_non_actionable_changes_are_excluded() {
	let mut changes = diverse_batch();
	changes[0].status = ChangeStatus::Accepted;
	changes[1].status = ChangeStatus::Invalid;
	let outcome = cluster(&changes, StrategyKind::Category, &ClusterConfig::default()).unwrap();
	let members: Vec<ChangeId> = outcome
		.clusters
		.iter()
		.flat_map(|c| c.members.iter().copied())
		.collect();
	assert!(!members.contains(&ChangeId(1)));
	assert!(!members.contains(&ChangeId(2)));
	assert_eq!(members.len(), 4);
}

#[test]
fn test_empty_input_is_an_error() {
	let err = cluster(&[], StrategyKind::Proximity, &ClusterConfig::default()).unwrap_err();
	assert_eq!(err, ClusterError::EmptyInput);
}

#[test]
fn test_dbscan_noise_reported_in_metadata() {
	// Two tight groups plus one far outlier in every feature dimension.
	let mut changes = vec![
		change(1, 0, "grammar", SourceKind::Ai, 0.9),
		change(2, 5, "grammar", SourceKind::Ai, 0.88),
		change(3, 10, "grammar", SourceKind::Ai, 0.92),
		change(4, 1000, "style", SourceKind::User, 0.4),
		change(5, 1005, "style", SourceKind::User, 0.42),
		change(6, 1010, "style", SourceKind::User, 0.38),
	];
	changes.push(change(7, 5000, "structure", SourceKind::System, 0.05));
	let mut config = ClusterConfig::default();
	config.dbscan.eps = 1.5;
	config.dbscan.min_samples = 3;
	let outcome = cluster(&changes, StrategyKind::Dbscan, &config).unwrap();
	assert!(outcome.metadata.noise.contains(&ChangeId(7)));
	assert!(outcome.metadata.efficiency < 1.0);
	assert!(!outcome.metadata.warnings.is_empty());
}

#[test]
fn test_metrics_are_bounded() {
	let changes = diverse_batch();
	for strategy in [
		StrategyKind::Proximity,
		StrategyKind::Category,
		StrategyKind::KMeans,
		StrategyKind::Hierarchical,
		StrategyKind::Spectral,
	] {
		let outcome = cluster(&changes, strategy, &ClusterConfig::default()).unwrap();
		for c in &outcome.clusters {
			for (name, v) in [
				("coherence", c.metrics.coherence),
				("confidence", c.metrics.confidence),
				("density", c.metrics.density),
				("diversity", c.metrics.diversity),
			] {
				assert!((0.0..=1.0).contains(&v), "{strategy:?} {name} = {v}");
			}
		}
	}
}

#[test]
fn test_singleton_coherence_is_one() {
	let changes = vec![
		change(1, 0, "grammar", SourceKind::Ai, 0.9),
		change(2, 5000, "style", SourceKind::User, 0.2),
	];
	let outcome = cluster(&changes, StrategyKind::Proximity, &ClusterConfig::default()).unwrap();
	assert_eq!(outcome.clusters.len(), 2);
	for c in &outcome.clusters {
		assert_eq!(c.metrics.coherence, 1.0);
	}
}

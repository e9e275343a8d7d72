use redline_primitives::{Change, ChangeId};
use rustc_hash::FxHashSet;

use crate::config::ClusterConfig;
use crate::features::FeatureMatrix;
use crate::metrics::{cluster_metrics, summarize};
use crate::types::{
	Cluster, ClusterError, ClusterId, ClusterOutcome, RunMetadata, StrategyKind,
};
use crate::{category, dbscan, hierarchical, kmeans, proximity, spectral};

/// Feature-based strategies need enough input to be meaningful.
const ML_MIN_CHANGES: usize = 4;
/// Required confidence spread (max - min) for the feature-based family.
const ML_MIN_CONFIDENCE_SPREAD: f64 = 0.2;

/// Checks whether a strategy can produce meaningful clusters for an input.
///
/// Proximity and category accept any non-empty input. The feature-based
/// family needs at least [`ML_MIN_CHANGES`] changes, diversity in category
/// or source, and a confidence spread above [`ML_MIN_CONFIDENCE_SPREAD`];
/// a refusal tells the caller to fall back to a simpler strategy.
pub fn can_handle(strategy: StrategyKind, changes: &[Change]) -> Result<(), ClusterError> {
	if changes.is_empty() {
		return Err(ClusterError::EmptyInput);
	}
	if !strategy.is_feature_based() {
		return Ok(());
	}

	let unsupported = |reason: &str| {
		Err(ClusterError::Unsupported {
			strategy,
			reason: reason.to_owned(),
		})
	};

	if changes.len() < ML_MIN_CHANGES {
		return unsupported("fewer than 4 changes");
	}
	let categories: FxHashSet<&str> = changes.iter().map(|c| c.category.as_str()).collect();
	let sources: FxHashSet<_> = changes.iter().map(|c| c.source.kind).collect();
	if categories.len() < 2 && sources.len() < 2 {
		return unsupported("no category or source diversity");
	}
	let (lo, hi) = changes.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
		(lo.min(c.source.confidence), hi.max(c.source.confidence))
	});
	if hi - lo <= ML_MIN_CONFIDENCE_SPREAD {
		return unsupported("confidence spread at or below 0.2");
	}
	Ok(())
}

/// Partitions a pending-change snapshot with the chosen strategy.
///
/// Non-actionable changes (terminal or invalid) are filtered out before
/// anything runs; clusters are derived views over what remains. The run
/// holds no state: identical input, strategy, and config — including the
/// k-means seed — reproduce identical output.
pub fn cluster(
	changes: &[Change],
	strategy: StrategyKind,
	config: &ClusterConfig,
) -> Result<ClusterOutcome, ClusterError> {
	let actionable: Vec<Change> = changes
		.iter()
		.filter(|c| c.status.is_actionable())
		.cloned()
		.collect();
	can_handle(strategy, &actionable)?;

	let mut warnings = Vec::new();
	let features = FeatureMatrix::extract(
		&actionable,
		config.proximity_threshold,
		config.normalize_features,
	);

	let (groups, noise_idx) = match strategy {
		StrategyKind::Proximity => (proximity::group(&actionable, config.proximity_threshold), vec![]),
		StrategyKind::Category => (category::group(&actionable), vec![]),
		StrategyKind::KMeans => {
			let k = effective_k(actionable.len(), config, &mut warnings);
			let assignments = kmeans::assign(&features.rows, k, config.kmeans.max_iterations, config.kmeans.seed);
			(groups_from_assignments(&assignments, k), vec![])
		}
		StrategyKind::Dbscan => {
			let (groups, noise) = dbscan::assign(&features.rows, config.dbscan.eps, config.dbscan.min_samples);
			if !noise.is_empty() {
				warnings.push(format!("{} changes excluded as noise", noise.len()));
			}
			(groups, noise)
		}
		StrategyKind::Hierarchical => {
			(hierarchical::assign(&features.rows, config.hierarchical_target), vec![])
		}
		StrategyKind::Spectral => {
			let k = effective_k(actionable.len(), config, &mut warnings);
			let assignments = spectral::assign(
				&features.rows,
				k,
				config.spectral_gamma,
				config.kmeans.max_iterations,
				config.kmeans.seed,
			);
			(groups_from_assignments(&assignments, k), vec![])
		}
	};

	let category_total = actionable
		.iter()
		.map(|c| c.category.as_str())
		.collect::<FxHashSet<_>>()
		.len();

	let mut clusters: Vec<Cluster> = groups
		.into_iter()
		.filter(|members| !members.is_empty())
		.map(|members| Cluster {
			id: ClusterId(0),
			strategy,
			centroid: summarize(&actionable, &members),
			metrics: cluster_metrics(&features.rows, &members, &actionable, category_total),
			members: members.iter().map(|&i| actionable[i].id).collect(),
		})
		.collect();
	clusters.sort_by_key(|c| (c.centroid.covering_span, c.members.clone()));
	for (idx, cluster) in clusters.iter_mut().enumerate() {
		cluster.id = ClusterId(idx as u64);
	}

	let clustered: usize = clusters.iter().map(|c| c.members.len()).sum();
	let confidence = if clustered == 0 {
		0.0
	} else {
		clusters
			.iter()
			.map(|c| c.metrics.confidence * c.members.len() as f64)
			.sum::<f64>()
			/ clustered as f64
	};
	let efficiency = clustered as f64 / actionable.len() as f64;
	let noise: Vec<ChangeId> = noise_idx.iter().map(|&i| actionable[i].id).collect();

	tracing::debug!(
		strategy = ?strategy,
		input = actionable.len(),
		clusters = clusters.len(),
		noise = noise.len(),
		"cluster.run"
	);

	Ok(ClusterOutcome {
		clusters,
		metadata: RunMetadata {
			confidence,
			efficiency,
			warnings,
			noise,
		},
	})
}

/// Clamps the requested k to `min(k, n / min_cluster_size, max_clusters)`,
/// floored at one.
fn effective_k(n: usize, config: &ClusterConfig, warnings: &mut Vec<String>) -> usize {
	let by_size = n / config.min_cluster_size.max(1);
	let k = config
		.kmeans
		.k
		.min(by_size)
		.min(config.max_clusters)
		.clamp(1, n);
	if k < config.kmeans.k {
		warnings.push(format!("k reduced from {} to {}", config.kmeans.k, k));
	}
	k
}

/// Converts flat assignments into member groups, dropping emptied labels.
fn groups_from_assignments(assignments: &[usize], k: usize) -> Vec<Vec<usize>> {
	let mut groups = vec![Vec::new(); k];
	for (idx, &label) in assignments.iter().enumerate() {
		groups[label].push(idx);
	}
	groups
}

#[cfg(test)]
mod tests;

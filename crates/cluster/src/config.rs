use redline_primitives::CharLen;

/// Tunables for one clustering run.
///
/// Defaults are sized for review batches of a few dozen changes. Hosts
/// pass an explicit config per call; the engine reads nothing global.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
	/// Maximum character gap joining two changes in a proximity group.
	pub proximity_threshold: CharLen,
	/// Smallest membership a k-means cluster is sized for; bounds the
	/// effective `k` as `n / min_cluster_size`.
	pub min_cluster_size: usize,
	/// Hard ceiling on the effective `k`.
	pub max_clusters: usize,
	/// k-means parameters (shared by the spectral embedding pass).
	pub kmeans: KMeansConfig,
	/// DBSCAN parameters.
	pub dbscan: DbscanConfig,
	/// Cluster count the agglomeration stops at.
	pub hierarchical_target: usize,
	/// RBF kernel width for the spectral embedding.
	pub spectral_gamma: f64,
	/// Whether to z-score normalize feature columns before clustering.
	pub normalize_features: bool,
}

/// k-means parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansConfig {
	/// Requested cluster count, before the effective-`k` clamp.
	pub k: usize,
	/// Iteration cap; runs stop earlier when no point is reassigned.
	pub max_iterations: usize,
	/// Seed for k-means++ initialization. Identical input, config, and
	/// seed reproduce identical clusters.
	pub seed: u64,
}

/// DBSCAN parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbscanConfig {
	/// Neighborhood radius in feature space.
	pub eps: f64,
	/// Neighbors (self included) required to seed a dense region.
	pub min_samples: usize,
}

impl Default for ClusterConfig {
	fn default() -> Self {
		Self {
			proximity_threshold: 50,
			min_cluster_size: 2,
			max_clusters: 8,
			kmeans: KMeansConfig {
				k: 4,
				max_iterations: 32,
				seed: 0,
			},
			dbscan: DbscanConfig {
				eps: 0.8,
				min_samples: 3,
			},
			hierarchical_target: 4,
			spectral_gamma: 1.0,
			normalize_features: true,
		}
	}
}

use redline_primitives::{ChangeId, Span, SourceKind};
use serde::Serialize;
use thiserror::Error;

/// Which algorithm produced a cluster.
///
/// `Proximity` and `Category` are fully deterministic; the remaining four
/// are the feature-vector family and are deterministic given the seed in
/// [`KMeansConfig`](crate::config::KMeansConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StrategyKind {
	/// Group changes whose spans lie within a character distance.
	Proximity,
	/// One cluster per distinct category value.
	Category,
	/// Seeded k-means over feature vectors.
	KMeans,
	/// Density clustering; sparse points become noise.
	Dbscan,
	/// Average-linkage agglomeration to a target count.
	Hierarchical,
	/// Similarity-kernel embedding fed to k-means.
	Spectral,
}

impl StrategyKind {
	/// Returns true for the feature-vector strategies.
	pub fn is_feature_based(self) -> bool {
		matches!(
			self,
			StrategyKind::KMeans | StrategyKind::Dbscan | StrategyKind::Hierarchical | StrategyKind::Spectral
		)
	}
}

/// Identifier of a cluster within one engine run.
///
/// Clusters are not persisted; ids are only stable within the run that
/// produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ClusterId(pub u64);

/// Summary of a cluster's membership.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Centroid {
	/// Most frequent category among members (lexicographic tie-break).
	pub dominant_category: String,
	/// Most frequent source kind among members.
	pub dominant_source: SourceKind,
	/// Mean member confidence.
	pub mean_confidence: f64,
	/// Smallest span covering every member.
	pub covering_span: Span,
}

/// Quality metrics for one cluster, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterMetrics {
	/// Mean pairwise feature similarity; 1.0 for singletons.
	pub coherence: f64,
	/// Mean member confidence.
	pub confidence: f64,
	/// Inverse of the mean distance to the feature centroid.
	pub density: f64,
	/// Distinct (category, source, kind) values over the possible total.
	pub diversity: f64,
}

/// A grouping of pending changes produced by one strategy run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
	/// Run-local identifier.
	pub id: ClusterId,
	/// Producing algorithm.
	pub strategy: StrategyKind,
	/// Member change ids; never empty, disjoint across the run's clusters.
	pub members: Vec<ChangeId>,
	/// Membership summary.
	pub centroid: Centroid,
	/// Quality metrics.
	pub metrics: ClusterMetrics,
}

/// Run-level metadata accompanying the clusters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunMetadata {
	/// Size-weighted mean cluster confidence.
	pub confidence: f64,
	/// Fraction of the input that ended up in a cluster.
	pub efficiency: f64,
	/// Human-readable notes about degraded parameters.
	pub warnings: Vec<String>,
	/// Changes excluded as noise (DBSCAN only).
	pub noise: Vec<ChangeId>,
}

/// Output of one clustering run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterOutcome {
	/// The produced clusters, ordered by covering span.
	pub clusters: Vec<Cluster>,
	/// Run-level metadata.
	pub metadata: RunMetadata,
}

/// Reasons a clustering run is refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
	/// No actionable changes were supplied.
	#[error("no actionable changes to cluster")]
	EmptyInput,
	/// The strategy's suitability check refused the input.
	#[error("{strategy:?} cannot handle this input: {reason}")]
	Unsupported {
		/// The refused strategy.
		strategy: StrategyKind,
		/// Why the input is unsuitable.
		reason: String,
	},
}

use crate::features::rbf;
use crate::kmeans;

/// Similarity-kernel-augmented k-means, standing in for spectral clustering.
///
/// Each point's row of RBF similarities to the whole batch becomes its
/// embedding; points with similar affinity profiles land together even
/// when their raw features sit far apart. The embedding is fed to the same
/// seeded k-means as [`StrategyKind::KMeans`](crate::types::StrategyKind).
pub fn assign(rows: &[Vec<f64>], k: usize, gamma: f64, max_iterations: usize, seed: u64) -> Vec<usize> {
	let embedding: Vec<Vec<f64>> = rows
		.iter()
		.map(|a| rows.iter().map(|b| rbf(a, b, gamma)).collect())
		.collect();
	kmeans::assign(&embedding, k, max_iterations, seed)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_blob_separation_via_kernel() {
		let rows = vec![
			vec![0.0, 0.0],
			vec![0.2, 0.0],
			vec![0.0, 0.2],
			vec![4.0, 4.0],
			vec![4.2, 4.0],
			vec![4.0, 4.2],
		];
		let assignments = assign(&rows, 2, 1.0, 32, 11);
		assert_eq!(assignments[0], assignments[1]);
		assert_eq!(assignments[0], assignments[2]);
		assert_eq!(assignments[3], assignments[4]);
		assert_ne!(assignments[0], assignments[3]);
	}

	#[test]
	fn test_seed_determinism() {
		let rows: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64, (i % 3) as f64]).collect();
		assert_eq!(assign(&rows, 3, 0.5, 32, 9), assign(&rows, 3, 0.5, 32, 9));
	}
}

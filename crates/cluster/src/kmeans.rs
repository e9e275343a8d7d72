use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::features::{euclidean, mean_of};

/// Seeded k-means over feature rows.
///
/// k-means++ initialization, Euclidean distance, early stop when no point
/// is reassigned. An emptied cluster is reseeded from the point farthest
/// from its own centroid. Returns one cluster index per row.
pub fn assign(rows: &[Vec<f64>], k: usize, max_iterations: usize, seed: u64) -> Vec<usize> {
	debug_assert!(k >= 1 && k <= rows.len());
	let mut rng = StdRng::seed_from_u64(seed);
	let mut centroids = plus_plus_seeds(rows, k, &mut rng);
	let mut assignments = vec![0usize; rows.len()];

	let mut first_pass = true;
	for _ in 0..max_iterations {
		let mut moved = false;
		for (idx, row) in rows.iter().enumerate() {
			let nearest = nearest_centroid(row, &centroids);
			if assignments[idx] != nearest {
				assignments[idx] = nearest;
				moved = true;
			}
		}
		if !moved && !first_pass {
			break;
		}
		first_pass = false;

		let mut next = Vec::with_capacity(k);
		for cid in 0..k {
			let members: Vec<usize> = (0..rows.len()).filter(|&i| assignments[i] == cid).collect();
			if members.is_empty() {
				// Reseed from the point farthest from its current centroid.
				let farthest = (0..rows.len())
					.max_by(|&a, &b| {
						let da = euclidean(&rows[a], &centroids[assignments[a]]);
						let db = euclidean(&rows[b], &centroids[assignments[b]]);
						da.total_cmp(&db)
					})
					.unwrap_or(0);
				tracing::debug!(cluster = cid, "kmeans.reseed_empty");
				next.push(rows[farthest].clone());
				continue;
			}
			next.push(mean_of(rows, &members));
		}
		centroids = next;
	}

	assignments
}

/// k-means++ seeding: the first centroid is uniform, later ones are drawn
/// proportional to squared distance from the nearest chosen centroid.
fn plus_plus_seeds(rows: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
	let mut centroids = Vec::with_capacity(k);
	centroids.push(rows[rng.gen_range(0..rows.len())].clone());

	while centroids.len() < k {
		let weights: Vec<f64> = rows
			.iter()
			.map(|row| {
				centroids
					.iter()
					.map(|c| euclidean(row, c))
					.fold(f64::INFINITY, f64::min)
					.powi(2)
			})
			.collect();
		let total: f64 = weights.iter().sum();
		let pick = if total <= f64::EPSILON {
			// All remaining mass is on already-chosen points.
			rng.gen_range(0..rows.len())
		} else {
			let mut target = rng.r#gen::<f64>() * total;
			let mut chosen = rows.len() - 1;
			for (idx, w) in weights.iter().enumerate() {
				target -= w;
				if target <= 0.0 {
					chosen = idx;
					break;
				}
			}
			chosen
		};
		centroids.push(rows[pick].clone());
	}

	centroids
}

/// Index of the nearest centroid; ties go to the lowest index.
fn nearest_centroid(row: &[f64], centroids: &[Vec<f64>]) -> usize {
	let mut best = 0;
	let mut best_d = f64::INFINITY;
	for (idx, c) in centroids.iter().enumerate() {
		let d = euclidean(row, c);
		if d < best_d {
			best_d = d;
			best = idx;
		}
	}
	best
}

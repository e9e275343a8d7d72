use redline_primitives::{Change, Span};
use rustc_hash::FxHashSet;

use crate::features::{euclidean, mean_of, similarity};
use crate::types::{Centroid, ClusterMetrics};

/// Computes the quality metrics for one member set.
///
/// `category_total` is the number of distinct categories in the whole
/// input, the denominator of the category share of diversity.
pub fn cluster_metrics(
	rows: &[Vec<f64>],
	members: &[usize],
	changes: &[Change],
	category_total: usize,
) -> ClusterMetrics {
	debug_assert!(!members.is_empty());

	let coherence = if members.len() < 2 {
		1.0
	} else {
		let mut total = 0.0;
		let mut pairs = 0usize;
		for (i, &a) in members.iter().enumerate() {
			for &b in &members[i + 1..] {
				total += similarity(&rows[a], &rows[b]);
				pairs += 1;
			}
		}
		total / pairs as f64
	};

	let centroid = mean_of(rows, members);
	let mean_dist = members
		.iter()
		.map(|&i| euclidean(&rows[i], &centroid))
		.sum::<f64>()
		/ members.len() as f64;
	let density = 1.0 / (1.0 + mean_dist);

	let categories: FxHashSet<&str> =
		members.iter().map(|&i| changes[i].category.as_str()).collect();
	let sources: FxHashSet<_> = members.iter().map(|&i| changes[i].source.kind).collect();
	let kinds: FxHashSet<_> = members.iter().map(|&i| changes[i].kind).collect();
	let diversity = (categories.len() as f64 / category_total.max(1) as f64
		+ sources.len() as f64 / 4.0
		+ kinds.len() as f64 / 3.0)
		/ 3.0;

	let confidence = members
		.iter()
		.map(|&i| changes[i].source.confidence)
		.sum::<f64>()
		/ members.len() as f64;

	ClusterMetrics {
		coherence,
		confidence,
		density,
		diversity,
	}
}

/// Builds the membership summary for one member set.
pub fn summarize(changes: &[Change], members: &[usize]) -> Centroid {
	debug_assert!(!members.is_empty());

	let dominant_category = dominant(members.iter().map(|&i| changes[i].category.as_str()))
		.unwrap_or_default()
		.to_owned();
	let dominant_source = dominant(members.iter().map(|&i| changes[i].source.kind))
		.unwrap_or(changes[members[0]].source.kind);

	let mean_confidence = members
		.iter()
		.map(|&i| changes[i].source.confidence)
		.sum::<f64>()
		/ members.len() as f64;

	let covering_span = members
		.iter()
		.map(|&i| changes[i].span)
		.reduce(|a, b| a.cover(&b))
		.unwrap_or(Span::point(0));

	Centroid {
		dominant_category,
		dominant_source,
		mean_confidence,
		covering_span,
	}
}

/// Most frequent value; ties resolve to the smaller value for determinism.
fn dominant<T: Ord + Clone>(values: impl Iterator<Item = T>) -> Option<T> {
	let mut counts: Vec<(T, usize)> = Vec::new();
	for value in values {
		match counts.iter_mut().find(|(v, _)| *v == value) {
			Some((_, n)) => *n += 1,
			None => counts.push((value, 1)),
		}
	}
	counts
		.into_iter()
		.max_by(|(va, na), (vb, nb)| na.cmp(nb).then_with(|| vb.cmp(va)))
		.map(|(v, _)| v)
}

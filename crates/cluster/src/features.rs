//! Feature vector extraction over a change snapshot.
//!
//! Every feature-based strategy sees the same fixed-order layout:
//! one-hot(category), one-hot(source kind), one-hot(change kind),
//! confidence, normalized position, normalized span length, normalized
//! timestamp, complexity, and a local context score. Normalization ranges
//! come from the batch itself, so vectors from different runs are not
//! comparable.

use redline_primitives::{Change, ChangeKind, SourceKind};

/// Span length at which the complexity length factor reaches one half.
const COMPLEXITY_LEN_SCALE: f64 = 40.0;

const SOURCE_KINDS: [SourceKind; 4] = [
	SourceKind::User,
	SourceKind::Ai,
	SourceKind::Collaboration,
	SourceKind::System,
];

const CHANGE_KINDS: [ChangeKind; 3] = [ChangeKind::Insert, ChangeKind::Delete, ChangeKind::Replace];

/// Extracted feature vectors for one snapshot.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
	/// One row per change, in input order.
	pub rows: Vec<Vec<f64>>,
	/// Columns per row.
	pub dim: usize,
}

impl FeatureMatrix {
	/// Extracts the feature rows for a snapshot.
	///
	/// `proximity_threshold` feeds the context score; `normalize` applies
	/// per-column z-scoring afterwards (degenerate columns become 0).
	pub fn extract(changes: &[Change], proximity_threshold: usize, normalize: bool) -> Self {
		let mut categories: Vec<&str> = changes.iter().map(|c| c.category.as_str()).collect();
		categories.sort_unstable();
		categories.dedup();

		let max_extent = changes.iter().map(|c| c.span.end).max().unwrap_or(0).max(1);
		let max_len = changes.iter().map(|c| c.span.len()).max().unwrap_or(0).max(1);
		let min_ts = changes.iter().map(|c| c.recorded_at).min();
		let max_ts = changes.iter().map(|c| c.recorded_at).max();
		let ts_range = match (min_ts, max_ts) {
			(Some(lo), Some(hi)) => (hi - lo).num_milliseconds().max(1) as f64,
			_ => 1.0,
		};

		let dim = categories.len() + SOURCE_KINDS.len() + CHANGE_KINDS.len() + 5;
		let mut rows = Vec::with_capacity(changes.len());

		for change in changes {
			let mut row = Vec::with_capacity(dim);
			for cat in &categories {
				row.push(if change.category == *cat { 1.0 } else { 0.0 });
			}
			for kind in SOURCE_KINDS {
				row.push(if change.source.kind == kind { 1.0 } else { 0.0 });
			}
			for kind in CHANGE_KINDS {
				row.push(if change.kind == kind { 1.0 } else { 0.0 });
			}
			row.push(change.source.confidence);
			row.push(change.span.start as f64 / max_extent as f64);
			row.push(change.span.len() as f64 / max_len as f64);
			let age = min_ts
				.map(|lo| (change.recorded_at - lo).num_milliseconds() as f64)
				.unwrap_or(0.0);
			row.push(age / ts_range);
			row.push(complexity(change));
			row.push(context_score(change, changes, proximity_threshold));
			rows.push(row);
		}

		let mut matrix = Self { rows, dim };
		if normalize {
			matrix.z_score();
		}
		matrix
	}

	/// Z-scores every column in place.
	fn z_score(&mut self) {
		let n = self.rows.len();
		if n < 2 {
			return;
		}
		for col in 0..self.dim {
			let mean = self.rows.iter().map(|r| r[col]).sum::<f64>() / n as f64;
			let var = self.rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n as f64;
			let sd = var.sqrt();
			for row in &mut self.rows {
				row[col] = if sd > f64::EPSILON {
					(row[col] - mean) / sd
				} else {
					0.0
				};
			}
		}
	}
}

/// Mean of a length factor and the confidence deficit.
fn complexity(change: &Change) -> f64 {
	let len = change.span.len().max(change.content.before.chars().count()) as f64;
	let length_factor = len / (len + COMPLEXITY_LEN_SCALE);
	(length_factor + (1.0 - change.source.confidence)) / 2.0
}

/// Fraction of the rest of the batch within the proximity window.
fn context_score(change: &Change, all: &[Change], threshold: usize) -> f64 {
	if all.len() < 2 {
		return 0.0;
	}
	let near = all
		.iter()
		.filter(|other| other.id != change.id && change.span.gap_to(&other.span) <= threshold)
		.count();
	near as f64 / (all.len() - 1) as f64
}

/// Euclidean distance between two feature rows.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
	debug_assert_eq!(a.len(), b.len());
	a.iter()
		.zip(b)
		.map(|(x, y)| (x - y).powi(2))
		.sum::<f64>()
		.sqrt()
}

/// Distance mapped into a `[0, 1]` similarity.
pub fn similarity(a: &[f64], b: &[f64]) -> f64 {
	1.0 / (1.0 + euclidean(a, b))
}

/// RBF kernel similarity `exp(-gamma * d^2)`.
pub fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
	let d = euclidean(a, b);
	(-gamma * d * d).exp()
}

/// Component-wise mean of the selected rows.
pub fn mean_of(rows: &[Vec<f64>], members: &[usize]) -> Vec<f64> {
	debug_assert!(!members.is_empty());
	let dim = rows[members[0]].len();
	let mut out = vec![0.0; dim];
	for &idx in members {
		for (acc, v) in out.iter_mut().zip(&rows[idx]) {
			*acc += v;
		}
	}
	for acc in &mut out {
		*acc /= members.len() as f64;
	}
	out
}

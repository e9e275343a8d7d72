use redline_primitives::Change;
use rustc_hash::FxHashMap;

/// One group per distinct category value.
///
/// Groups are ordered by category name, members keep input order, and the
/// groups partition the input: N changes with k distinct categories always
/// produce exactly k non-empty groups.
pub fn group(changes: &[Change]) -> Vec<Vec<usize>> {
	let mut buckets: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
	for (idx, change) in changes.iter().enumerate() {
		buckets.entry(change.category.as_str()).or_default().push(idx);
	}
	let mut named: Vec<(&str, Vec<usize>)> = buckets.into_iter().collect();
	named.sort_unstable_by_key(|(name, _)| *name);
	named.into_iter().map(|(_, members)| members).collect()
}

use redline_primitives::{Change, CharLen, Span};

/// Groups changes by character distance, in input order.
///
/// Each change joins an existing group when the gap between its span and
/// the group's covering span is within the threshold. When several groups
/// qualify, the one whose covering span grows the least wins; ties go to
/// the earliest group. Fully deterministic.
pub fn group(changes: &[Change], threshold: CharLen) -> Vec<Vec<usize>> {
	let mut groups: Vec<(Span, Vec<usize>)> = Vec::new();

	for (idx, change) in changes.iter().enumerate() {
		let mut best: Option<(usize, CharLen)> = None;
		for (gid, (cover, _)) in groups.iter().enumerate() {
			if change.span.gap_to(cover) > threshold {
				continue;
			}
			let grown = cover.cover(&change.span).len();
			if best.is_none_or(|(_, best_len)| grown < best_len) {
				best = Some((gid, grown));
			}
		}
		match best {
			Some((gid, _)) => {
				let (cover, members) = &mut groups[gid];
				*cover = cover.cover(&change.span);
				members.push(idx);
			}
			None => groups.push((change.span, vec![idx])),
		}
	}

	groups.into_iter().map(|(_, members)| members).collect()
}

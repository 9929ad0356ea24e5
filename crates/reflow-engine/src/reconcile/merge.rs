use std::collections::VecDeque;

use crate::units::ChangeKind;

use super::compile::ChangeDescriptor;

/// Why two neighbouring islands have to become one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeReason {
    /// The first island's sync point is where the second one starts, so
    /// nothing reusable lies between them.
    BackToBack,
    /// Back to back, and the second island replaces its first unit: the
    /// first island's sync point would be disposed before it is reached.
    ReplacedAtResume,
    /// The first island runs to the end of the list.
    OpenEnded,
    /// The second island starts before the first one's sync point.
    Overlapping,
}

fn merge_reason(a: &ChangeDescriptor, b: &ChangeDescriptor) -> Option<MergeReason> {
    match (a.sync_point, b.first_affected) {
        (None, _) => Some(MergeReason::OpenEnded),
        (Some(sync), Some(first)) if sync == first && b.kind == ChangeKind::Replaced => {
            Some(MergeReason::ReplacedAtResume)
        }
        (Some(sync), Some(first)) if sync == first => Some(MergeReason::BackToBack),
        (Some(_), Some(_)) if a.sync_start.is_some_and(|s| b.first_start < s) => {
            Some(MergeReason::Overlapping)
        }
        // A pure append lies past every unit, including `a`'s sync point
        _ => None,
    }
}

fn fold(a: ChangeDescriptor, b: ChangeDescriptor) -> ChangeDescriptor {
    let kind = if a.kind == ChangeKind::Replaced || b.kind == ChangeKind::Replaced {
        ChangeKind::Replaced
    } else {
        ChangeKind::ModifiedInPlace
    };
    // Keep whichever sync point lies further along; `None` is the list end
    let (sync_point, sync_start) = match (a.sync_start, b.sync_start) {
        (Some(x), Some(y)) if x > y => (a.sync_point, a.sync_start),
        (None, _) => (None, None),
        _ => (b.sync_point, b.sync_start),
    };
    ChangeDescriptor {
        kind,
        first_affected: a.first_affected,
        sync_point,
        first_start: a.first_start,
        sync_start,
        net: a.net + b.net,
    }
}

/// Coalesces an ordered chain of descriptors into minimal disjoint islands.
///
/// Every merge keeps the earlier island's start, so comparing each
/// descriptor against the last emitted island is enough to reach the fixed
/// point in one pass.
pub fn merge(chain: impl IntoIterator<Item = ChangeDescriptor>) -> VecDeque<ChangeDescriptor> {
    let mut out: VecDeque<ChangeDescriptor> = VecDeque::new();
    for next in chain {
        match out.back().and_then(|last| merge_reason(last, &next)) {
            Some(reason) => {
                log::trace!("merging island at {} ({reason:?})", next.first_start);
                if let Some(last) = out.pop_back() {
                    out.push_back(fold(last, next));
                }
            }
            None => out.push_back(next),
        }
    }
    out
}

/// True when no two neighbouring islands in `chain` would merge.
pub fn is_disjoint<'a>(chain: impl IntoIterator<Item = &'a ChangeDescriptor>) -> bool {
    let chain: Vec<_> = chain.into_iter().collect();
    chain
        .windows(2)
        .all(|pair| merge_reason(pair[0], pair[1]).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{DirtyRange, compile};
    use crate::units::{LayoutUnit, NodeList, UnitId, UnitKind, UnitSpec};
    use pretty_assertions::assert_eq;

    fn atomic_list(count: usize, len: usize) -> (NodeList<()>, Vec<UnitId>) {
        let mut list = NodeList::new();
        let mut ids = Vec::new();
        for i in 0..count {
            let unit = LayoutUnit::fabricated(UnitSpec::new(UnitKind::Atomic, len), i * len, 1);
            ids.push(list.insert_after(ids.last().copied(), unit).unwrap());
        }
        (list, ids)
    }

    fn compile_all(list: &NodeList<()>, ranges: &[DirtyRange]) -> Vec<ChangeDescriptor> {
        ranges.iter().map(|r| compile(list, 0, r).unwrap()).collect()
    }

    #[test]
    fn distant_islands_stay_apart() {
        let (list, ids) = atomic_list(6, 10);
        let chain = compile_all(&list, &[DirtyRange::new(12, 1, 1), DirtyRange::new(42, 1, 1)]);
        let merged = merge(chain);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].first_affected, Some(ids[1]));
        assert_eq!(merged[1].first_affected, Some(ids[4]));
        assert!(is_disjoint(&merged));
    }

    #[test]
    fn back_to_back_islands_merge() {
        let (list, ids) = atomic_list(4, 10);
        // First island is [B, C), second starts at C
        let chain = compile_all(&list, &[DirtyRange::new(12, 1, 0), DirtyRange::new(25, 1, 3)]);
        assert_eq!(chain[0].sync_point, chain[1].first_affected);
        let merged = merge(chain);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].first_affected, Some(ids[1]));
        assert_eq!(merged[0].sync_point, Some(ids[3]));
        assert_eq!(merged[0].kind, ChangeKind::ModifiedInPlace);
        assert_eq!(merged[0].net, 1);
    }

    #[test]
    fn replaced_successor_makes_the_merge_replaced() {
        let (list, ids) = atomic_list(4, 10);
        let chain = compile_all(&list, &[DirtyRange::new(12, 1, 0), DirtyRange::new(20, 10, 0)]);
        assert_eq!(chain[1].kind, ChangeKind::Replaced);
        let merged = merge(chain);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, ChangeKind::Replaced);
        assert_eq!(merged[0].first_affected, Some(ids[1]));
        assert_eq!(merged[0].sync_point, Some(ids[3]));
    }

    #[test]
    fn two_edits_inside_one_unit_overlap() {
        let (list, ids) = atomic_list(3, 10);
        let chain = compile_all(&list, &[DirtyRange::new(11, 1, 0), DirtyRange::new(15, 0, 2)]);
        let merged = merge(chain);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].first_affected, Some(ids[1]));
        assert_eq!(merged[0].sync_point, Some(ids[2]));
        assert_eq!(merged[0].net, 1);
    }

    #[test]
    fn open_ended_island_swallows_the_append() {
        let (list, ids) = atomic_list(3, 10);
        let chain = compile_all(&list, &[DirtyRange::new(25, 5, 0), DirtyRange::new(30, 0, 8)]);
        assert_eq!(chain[1].first_affected, None);
        let merged = merge(chain);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].first_affected, Some(ids[2]));
        assert_eq!(merged[0].sync_point, None);
    }

    #[test]
    fn append_after_a_synced_island_stays_separate() {
        let (list, _) = atomic_list(3, 10);
        let chain = compile_all(&list, &[DirtyRange::new(5, 1, 0), DirtyRange::new(30, 0, 8)]);
        assert_eq!(merge(chain).len(), 2);
    }

    #[test]
    fn merging_is_idempotent() {
        let (list, _) = atomic_list(8, 10);
        let chain = compile_all(
            &list,
            &[
                DirtyRange::new(3, 1, 0),
                DirtyRange::new(12, 0, 1),
                DirtyRange::new(20, 10, 0),
                DirtyRange::new(55, 2, 2),
                DirtyRange::new(80, 0, 9),
            ],
        );
        let once = merge(chain);
        let twice = merge(once.clone());
        assert_eq!(once, twice);
        assert!(is_disjoint(&once));
    }
}

use std::ops::Range;

use serde::Serialize;
use xi_rope::{Delta, RopeInfo, delta::DeltaElement};

use crate::error::{ReconcileError, Result};

/// One edit, expressed in the coordinates of the cached layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirtyRange {
    /// Position of the first affected character.
    pub start: usize,
    /// Number of cached positions removed at `start`.
    pub removed: usize,
    /// Number of new positions inserted at `start`.
    pub added: usize,
}

impl DirtyRange {
    pub fn new(start: usize, removed: usize, added: usize) -> Self {
        Self {
            start,
            removed,
            added,
        }
    }

    /// End of the removed region in cached coordinates.
    pub fn removed_end(&self) -> usize {
        self.start + self.removed
    }

    /// Net change in length caused by this edit.
    pub fn net(&self) -> isize {
        self.added as isize - self.removed as isize
    }

    /// Whether this edit touches `extent` (an edit ending or starting exactly
    /// on one of its edges counts).
    pub fn touches(&self, extent: &Range<usize>) -> bool {
        self.start <= extent.end && self.removed_end() >= extent.start
    }

    /// Collects the edits performed by a single delta, in the delta's base
    /// coordinates.
    ///
    /// Gaps between `Copy` elements are deletions and `Insert` elements are
    /// additions; adjacent deletions and insertions coalesce into one range.
    pub fn from_delta(delta: &Delta<RopeInfo>) -> Vec<DirtyRange> {
        let mut ranges = Vec::new();
        let mut pending: Option<DirtyRange> = None;
        let mut old_pos = 0;

        for op in &delta.els {
            match op {
                DeltaElement::Copy(from, to) => {
                    if *from > old_pos {
                        pending
                            .get_or_insert(DirtyRange::new(old_pos, 0, 0))
                            .removed += from - old_pos;
                    }
                    if to > from {
                        ranges.extend(pending.take());
                    }
                    old_pos = *to;
                }
                DeltaElement::Insert(inserted) if inserted.len() > 0 => {
                    pending
                        .get_or_insert(DirtyRange::new(old_pos, 0, 0))
                        .added += inserted.len();
                }
                DeltaElement::Insert(_) => {}
            }
        }

        // Trailing deletion up to the end of the old document
        if old_pos < delta.base_len {
            pending
                .get_or_insert(DirtyRange::new(old_pos, 0, 0))
                .removed += delta.base_len - old_pos;
        }
        ranges.extend(pending);
        ranges
    }
}

/// Rejects dirty range sets that are not ordered by start and mutually
/// non-overlapping.
pub fn validate(ranges: &[DirtyRange]) -> Result<()> {
    for pair in ranges.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if next.start < prev.removed_end() || next.start == prev.start {
            return Err(ReconcileError::UnorderedDirtyRanges {
                start: next.start,
                previous_end: prev.removed_end(),
            });
        }
    }
    Ok(())
}

/// Source of the edits made since the last completed reconciliation.
pub trait DirtyRangeTracker {
    /// Ordered, non-overlapping edits touching `extent` (cached coordinates).
    fn dirty_ranges(&self, extent: Range<usize>) -> Vec<DirtyRange>;
}

impl DirtyRangeTracker for [DirtyRange] {
    fn dirty_ranges(&self, extent: Range<usize>) -> Vec<DirtyRange> {
        self.iter().copied().filter(|r| r.touches(&extent)).collect()
    }
}

impl DirtyRangeTracker for Vec<DirtyRange> {
    fn dirty_ranges(&self, extent: Range<usize>) -> Vec<DirtyRange> {
        self.as_slice().dirty_ranges(extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use xi_rope::{Interval, Rope};

    fn edit(text: &str, range: Range<usize>, replacement: &str) -> Delta<RopeInfo> {
        Delta::simple_edit(
            Interval::new(range.start, range.end),
            Rope::from(replacement),
            text.len(),
        )
    }

    #[test]
    fn simple_insertion() {
        let delta = edit("hello world", 5..5, ", big");
        assert_eq!(DirtyRange::from_delta(&delta), vec![DirtyRange::new(5, 0, 5)]);
    }

    #[test]
    fn simple_deletion() {
        let delta = edit("hello world", 5..11, "");
        assert_eq!(DirtyRange::from_delta(&delta), vec![DirtyRange::new(5, 6, 0)]);
    }

    #[test]
    fn replacement_coalesces_into_one_range() {
        let delta = edit("hello world", 0..5, "howdy there");
        assert_eq!(
            DirtyRange::from_delta(&delta),
            vec![DirtyRange::new(0, 5, 11)]
        );
    }

    #[test]
    fn identity_delta_has_no_ranges() {
        let delta = edit("hello", 2..2, "");
        assert!(DirtyRange::from_delta(&delta).is_empty());
    }

    #[rstest]
    #[case(vec![DirtyRange::new(0, 2, 0), DirtyRange::new(2, 0, 3)], true)]
    #[case(vec![DirtyRange::new(0, 0, 1), DirtyRange::new(5, 1, 0)], true)]
    #[case(vec![DirtyRange::new(0, 5, 0), DirtyRange::new(3, 1, 0)], false)]
    #[case(vec![DirtyRange::new(8, 0, 0), DirtyRange::new(2, 1, 0)], false)]
    #[case(vec![DirtyRange::new(4, 0, 2), DirtyRange::new(4, 0, 1)], false)]
    fn validation(#[case] ranges: Vec<DirtyRange>, #[case] ok: bool) {
        assert_eq!(validate(&ranges).is_ok(), ok);
    }

    #[test]
    fn tracker_filters_by_extent() {
        let ranges = vec![
            DirtyRange::new(2, 1, 0),
            DirtyRange::new(10, 0, 4),
            DirtyRange::new(30, 2, 2),
        ];
        assert_eq!(
            ranges.dirty_ranges(10..20),
            vec![DirtyRange::new(10, 0, 4)]
        );
        // An edit sitting exactly on the end of the extent still touches it
        assert_eq!(ranges.dirty_ranges(20..30).len(), 1);
    }
}

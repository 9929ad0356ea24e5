use std::ops::Range;

use xi_rope::{Delta, RopeInfo};

use crate::reconcile::{DirtyRange, DirtyRangeTracker};

/// A run of the current text: either copied from the cached text or new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Copy { from: usize, to: usize },
    Insert { len: usize },
}

impl Piece {
    fn len(self) -> usize {
        match self {
            Piece::Copy { from, to } => to - from,
            Piece::Insert { len } => len,
        }
    }

    fn slice(self, offset: usize, len: usize) -> Piece {
        match self {
            Piece::Copy { from, .. } => Piece::Copy {
                from: from + offset,
                to: from + offset + len,
            },
            Piece::Insert { .. } => Piece::Insert { len },
        }
    }
}

/// Accumulates edits since the last completed pass and reports them as
/// dirty ranges in the coordinates of the cached layout.
///
/// The current text is kept as a piece table over the cached text, so any
/// number of overlapping edits collapses into one ordered, non-overlapping
/// set of ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditLog {
    pieces: Vec<Piece>,
    base_len: usize,
}

impl EditLog {
    /// A log with no edits over a cached text of `base_len`.
    pub fn new(base_len: usize) -> Self {
        let mut log = Self {
            pieces: Vec::new(),
            base_len: 0,
        };
        log.reset(base_len);
        log
    }

    /// Forgets every edit; the current text of `len` becomes the cached text.
    pub fn reset(&mut self, len: usize) {
        self.pieces.clear();
        push(&mut self.pieces, Piece::Copy { from: 0, to: len });
        self.base_len = len;
    }

    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Length of the text with every recorded edit applied.
    pub fn current_len(&self) -> usize {
        self.pieces.iter().map(|p| p.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.pieces == [Piece::Copy { from: 0, to: self.base_len }]
            || (self.base_len == 0 && self.pieces.is_empty())
    }

    /// Records one edit in current-text coordinates: `removed` characters at
    /// `start` were replaced by `added` new ones.
    pub fn record(&mut self, start: usize, removed: usize, added: usize) {
        let len = self.current_len();
        let start = start.min(len);
        let end = (start + removed).min(len);

        let mut pieces = Vec::with_capacity(self.pieces.len() + 2);
        for piece in cut(&self.pieces, 0..start) {
            push(&mut pieces, piece);
        }
        push(&mut pieces, Piece::Insert { len: added });
        for piece in cut(&self.pieces, end..len) {
            push(&mut pieces, piece);
        }
        self.pieces = pieces;
    }

    /// Records every edit a delta performs on the current text.
    pub fn record_delta(&mut self, delta: &Delta<RopeInfo>) {
        // Last edit first, so earlier positions are not shifted
        for range in DirtyRange::from_delta(delta).iter().rev() {
            self.record(range.start, range.removed, range.added);
        }
    }

    /// Maps a position in the current text back to the cached text. Inserted
    /// text maps to where it was inserted.
    pub fn to_cached(&self, position: usize) -> usize {
        let mut current = 0;
        let mut cached = 0;
        for piece in &self.pieces {
            let end = current + piece.len();
            match *piece {
                Piece::Copy { from, to } => {
                    if position < end {
                        return from + (position - current);
                    }
                    cached = to;
                }
                Piece::Insert { .. } if position < end => return cached,
                Piece::Insert { .. } => {}
            }
            current = end;
        }
        cached
    }

    /// Every accumulated edit, in cached coordinates.
    pub fn ranges(&self) -> Vec<DirtyRange> {
        let mut ranges = Vec::new();
        let mut cached = 0;
        let mut added = 0;
        for piece in &self.pieces {
            match *piece {
                Piece::Insert { len } => added += len,
                Piece::Copy { from, to } => {
                    if from > cached || added > 0 {
                        ranges.push(DirtyRange::new(cached, from - cached, added));
                    }
                    cached = to;
                    added = 0;
                }
            }
        }
        if cached < self.base_len || added > 0 {
            ranges.push(DirtyRange::new(cached, self.base_len - cached, added));
        }
        ranges
    }
}

impl Default for EditLog {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DirtyRangeTracker for EditLog {
    fn dirty_ranges(&self, extent: Range<usize>) -> Vec<DirtyRange> {
        self.ranges()
            .into_iter()
            .filter(|range| range.touches(&extent))
            .collect()
    }
}

/// The parts of `pieces` that fall inside `range` (current coordinates).
fn cut(pieces: &[Piece], range: Range<usize>) -> impl Iterator<Item = Piece> + '_ {
    let mut position = 0;
    pieces.iter().filter_map(move |&piece| {
        let start = position;
        let end = start + piece.len();
        position = end;
        let lo = start.max(range.start);
        let hi = end.min(range.end);
        (lo < hi).then(|| piece.slice(lo - start, hi - lo))
    })
}

/// Appends `piece`, coalescing it with the last piece where possible.
fn push(pieces: &mut Vec<Piece>, piece: Piece) {
    if piece.len() == 0 {
        return;
    }
    match (pieces.last_mut(), piece) {
        (Some(Piece::Insert { len }), Piece::Insert { len: more }) => *len += more,
        (Some(Piece::Copy { to, .. }), Piece::Copy { from, to: end }) if *to == from => *to = end,
        _ => pieces.push(piece),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use xi_rope::{Interval, Rope};

    #[test]
    fn fresh_log_is_clean() {
        let log = EditLog::new(30);
        assert!(log.is_clean());
        assert_eq!(log.ranges(), vec![]);
        assert!(EditLog::new(0).is_clean());
    }

    #[rstest]
    #[case::replace_inside(&[(12, 2, 5)], vec![DirtyRange::new(12, 2, 5)])]
    #[case::two_apart(&[(20, 0, 3), (2, 1, 0)], vec![DirtyRange::new(2, 1, 0), DirtyRange::new(20, 0, 3)])]
    #[case::edit_inside_inserted_text(&[(12, 2, 5), (15, 5, 0)], vec![DirtyRange::new(12, 5, 3)])]
    #[case::insert_at_start(&[(0, 0, 4)], vec![DirtyRange::new(0, 0, 4)])]
    #[case::delete_tail(&[(25, 5, 0)], vec![DirtyRange::new(25, 5, 0)])]
    #[case::append(&[(30, 0, 6)], vec![DirtyRange::new(30, 0, 6)])]
    #[case::insert_then_delete_it(&[(10, 0, 4), (10, 4, 0)], vec![])]
    fn edits_map_to_cached_ranges(
        #[case] edits: &[(usize, usize, usize)],
        #[case] expected: Vec<DirtyRange>,
    ) {
        let mut log = EditLog::new(30);
        for &(start, removed, added) in edits {
            log.record(start, removed, added);
        }
        assert_eq!(log.ranges(), expected);
    }

    #[test]
    fn current_length_follows_the_edits() {
        let mut log = EditLog::new(30);
        log.record(12, 2, 5);
        log.record(0, 10, 0);
        assert_eq!(log.current_len(), 23);
        assert_eq!(log.base_len(), 30);
    }

    #[test]
    fn delta_edits_are_recorded() {
        let mut log = EditLog::new(11);
        let delta = Delta::simple_edit(Interval::new(6, 11), Rope::from("there"), 11);
        log.record_delta(&delta);
        assert_eq!(log.ranges(), vec![DirtyRange::new(6, 5, 5)]);
    }

    #[test]
    fn ranges_are_filtered_by_extent() {
        let mut log = EditLog::new(40);
        log.record(30, 2, 0);
        log.record(5, 1, 1);
        assert_eq!(log.dirty_ranges(0..10), vec![DirtyRange::new(5, 1, 1)]);
        assert_eq!(log.dirty_ranges(20..30), vec![DirtyRange::new(30, 2, 0)]);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(11, 11)]
    #[case(12, 12)]
    #[case(16, 12)]
    #[case(17, 14)]
    #[case(33, 30)]
    fn current_positions_map_back(#[case] current: usize, #[case] cached: usize) {
        let mut log = EditLog::new(30);
        log.record(12, 2, 5);
        assert_eq!(log.to_cached(current), cached);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut log = EditLog::new(10);
        log.record(3, 2, 0);
        log.reset(8);
        assert!(log.is_clean());
        assert_eq!(log.base_len(), 8);
    }
}

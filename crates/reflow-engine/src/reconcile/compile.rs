use std::cmp::Ordering;

use crate::error::Result;
use crate::units::{ChangeKind, NodeList, UnitId};

use super::dirty::DirtyRange;

/// What one edit (or several merged edits) did to the node list.
///
/// The island runs from `first_affected` up to but excluding `sync_point`.
/// Positions are in cached coordinates, relative to the segment origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDescriptor {
    /// `ModifiedInPlace` keeps `first_affected` and asks for it to be
    /// reformatted; `Replaced` supersedes it.
    pub kind: ChangeKind,
    /// First unit touched by the edit; `None` means the edit lies past the
    /// end of the list (pure append).
    pub first_affected: Option<UnitId>,
    /// First unit after the island whose cache is still valid; `None` means
    /// the island runs to the end of the list.
    pub sync_point: Option<UnitId>,
    /// Cached start of `first_affected` (or the list end for an append).
    pub first_start: usize,
    /// Cached start of `sync_point`, when there is one.
    pub sync_start: Option<usize>,
    /// Net length change of the edits folded into this island.
    pub net: isize,
}

impl ChangeDescriptor {
    pub(crate) fn append(at: usize, net: isize) -> Self {
        Self {
            kind: ChangeKind::Replaced,
            first_affected: None,
            sync_point: None,
            first_start: at,
            sync_start: None,
            net,
        }
    }
}

/// Decision while looking for the first affected unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartEdge {
    /// The unit ends before the edit: keep walking.
    Advance,
    /// The unit is the first one touched.
    Stop,
}

/// Decision while looking for the sync point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndEdge {
    /// The unit is still inside the island.
    Continue,
    /// The unit closes the island; its successor is the sync point.
    SyncAfter,
    /// The unit begins after the edit and is the sync point itself.
    SyncAt,
}

/// Step 1: an edit landing exactly on the end of a splittable unit belongs
/// to that unit.
fn start_edge(unit_end: usize, edit_start: usize, splittable: bool) -> StartEdge {
    match (unit_end.cmp(&edit_start), splittable) {
        (Ordering::Less, _) => StartEdge::Advance,
        (Ordering::Equal, false) => StartEdge::Advance,
        (Ordering::Equal, true) => StartEdge::Stop,
        (Ordering::Greater, _) => StartEdge::Stop,
    }
}

/// Step 4: same tie-break as [`start_edge`], except a `Replaced` island never
/// treats an exact boundary hit as unsynced.
fn end_edge(
    unit_start: usize,
    unit_end: usize,
    removed_end: usize,
    is_first: bool,
    splittable: bool,
    kind: ChangeKind,
) -> EndEdge {
    if !is_first && unit_start >= removed_end {
        return EndEdge::SyncAt;
    }
    match (unit_end.cmp(&removed_end), splittable, kind) {
        (Ordering::Less, _, _) => EndEdge::Continue,
        (Ordering::Equal, true, ChangeKind::ModifiedInPlace) => EndEdge::Continue,
        (Ordering::Equal, _, _) => EndEdge::SyncAfter,
        (Ordering::Greater, _, _) => EndEdge::SyncAfter,
    }
}

/// Compiles one dirty range against the node list.
///
/// `origin` is the content position of the segment's first unit; the
/// range is in the same (absolute, cached) coordinates.
pub fn compile<P>(list: &NodeList<P>, origin: usize, range: &DirtyRange) -> Result<ChangeDescriptor> {
    let mut pos = origin;
    let mut cursor = list.head();

    while let Some(id) = cursor {
        let unit = list.node(id)?;
        let end = pos + unit.formatted_length;
        match start_edge(end, range.start, unit.kind.is_splittable()) {
            StartEdge::Advance => {
                pos = end;
                cursor = unit.next;
            }
            StartEdge::Stop => break,
        }
    }

    let Some(first) = cursor else {
        return Ok(ChangeDescriptor::append(pos - origin, range.net()));
    };
    let kind = if pos < range.start {
        ChangeKind::ModifiedInPlace
    } else {
        ChangeKind::Replaced
    };
    let first_start = pos;

    let removed_end = range.removed_end();
    let mut sync = None;
    let mut cursor = Some(first);
    while let Some(id) = cursor {
        let unit = list.node(id)?;
        let end = pos + unit.formatted_length;
        match end_edge(
            pos,
            end,
            removed_end,
            id == first,
            unit.kind.is_splittable(),
            kind,
        ) {
            EndEdge::Continue => {
                pos = end;
                cursor = unit.next;
            }
            EndEdge::SyncAfter => {
                sync = unit.next.map(|next| (next, end));
                break;
            }
            EndEdge::SyncAt => {
                sync = Some((id, pos));
                break;
            }
        }
    }

    Ok(ChangeDescriptor {
        kind,
        first_affected: Some(first),
        sync_point: sync.map(|(id, _)| id),
        first_start: first_start - origin,
        sync_start: sync.map(|(_, start)| start - origin),
        net: range.net(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{LayoutUnit, UnitKind, UnitSpec};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn list_of(units: &[(UnitKind, usize)]) -> (NodeList<()>, Vec<UnitId>) {
        let mut list = NodeList::new();
        let mut ids = Vec::new();
        let mut start = 0;
        for &(kind, len) in units {
            let unit = LayoutUnit::fabricated(UnitSpec::new(kind, len), start, 1);
            ids.push(list.insert_after(ids.last().copied(), unit).unwrap());
            start += len;
        }
        (list, ids)
    }

    const ATOMIC: UnitKind = UnitKind::Atomic;
    const PARA: UnitKind = UnitKind::Paragraph;

    #[rstest]
    #[case(5, 10, false, StartEdge::Advance)]
    #[case(10, 10, false, StartEdge::Advance)]
    #[case(10, 10, true, StartEdge::Stop)]
    #[case(12, 10, false, StartEdge::Stop)]
    #[case(12, 10, true, StartEdge::Stop)]
    fn start_edge_table(
        #[case] unit_end: usize,
        #[case] edit_start: usize,
        #[case] splittable: bool,
        #[case] expected: StartEdge,
    ) {
        assert_eq!(start_edge(unit_end, edit_start, splittable), expected);
    }

    #[rstest]
    #[case(10, 20, 25, true, true, ChangeKind::ModifiedInPlace, EndEdge::Continue)]
    #[case(10, 20, 20, true, true, ChangeKind::ModifiedInPlace, EndEdge::Continue)]
    #[case(10, 20, 20, true, true, ChangeKind::Replaced, EndEdge::SyncAfter)]
    #[case(10, 20, 20, true, false, ChangeKind::ModifiedInPlace, EndEdge::SyncAfter)]
    #[case(10, 20, 14, true, false, ChangeKind::ModifiedInPlace, EndEdge::SyncAfter)]
    #[case(20, 30, 20, false, true, ChangeKind::ModifiedInPlace, EndEdge::SyncAt)]
    #[case(10, 20, 10, true, false, ChangeKind::Replaced, EndEdge::SyncAfter)]
    fn end_edge_table(
        #[case] unit_start: usize,
        #[case] unit_end: usize,
        #[case] removed_end: usize,
        #[case] is_first: bool,
        #[case] splittable: bool,
        #[case] kind: ChangeKind,
        #[case] expected: EndEdge,
    ) {
        assert_eq!(
            end_edge(unit_start, unit_end, removed_end, is_first, splittable, kind),
            expected
        );
    }

    #[test]
    fn edit_inside_a_unit_is_modified_in_place() {
        let (list, ids) = list_of(&[(ATOMIC, 10), (ATOMIC, 10), (ATOMIC, 10)]);
        let d = compile(&list, 0, &DirtyRange::new(12, 2, 5)).unwrap();
        assert_eq!(d.kind, ChangeKind::ModifiedInPlace);
        assert_eq!(d.first_affected, Some(ids[1]));
        assert_eq!(d.sync_point, Some(ids[2]));
        assert_eq!((d.first_start, d.sync_start), (10, Some(20)));
        assert_eq!(d.net, 3);
    }

    #[test]
    fn deletion_of_a_whole_unit_replaces_it() {
        let (list, ids) = list_of(&[(ATOMIC, 10), (ATOMIC, 10), (ATOMIC, 10)]);
        let d = compile(&list, 0, &DirtyRange::new(10, 10, 0)).unwrap();
        assert_eq!(d.kind, ChangeKind::Replaced);
        assert_eq!(d.first_affected, Some(ids[1]));
        assert_eq!(d.sync_point, Some(ids[2]));
    }

    #[test]
    fn splittable_unit_absorbs_an_edit_on_its_end() {
        let (list, ids) = list_of(&[(PARA, 10), (PARA, 10), (PARA, 10)]);
        let d = compile(&list, 0, &DirtyRange::new(10, 10, 0)).unwrap();
        assert_eq!(d.kind, ChangeKind::ModifiedInPlace);
        assert_eq!(d.first_affected, Some(ids[0]));
        assert_eq!(d.sync_point, Some(ids[2]));
        assert_eq!(d.sync_start, Some(20));
    }

    #[test]
    fn insertion_at_the_end_of_a_splittable_unit_syncs_on_its_successor() {
        let (list, ids) = list_of(&[(PARA, 10), (ATOMIC, 10)]);
        let d = compile(&list, 0, &DirtyRange::new(10, 0, 4)).unwrap();
        assert_eq!(d.kind, ChangeKind::ModifiedInPlace);
        assert_eq!(d.first_affected, Some(ids[0]));
        assert_eq!(d.sync_point, Some(ids[1]));
    }

    #[test]
    fn edit_past_the_end_is_an_append() {
        let (list, _) = list_of(&[(ATOMIC, 10), (ATOMIC, 10)]);
        let d = compile(&list, 0, &DirtyRange::new(20, 0, 7)).unwrap();
        assert_eq!(d, ChangeDescriptor::append(20, 7));
    }

    #[test]
    fn edit_spanning_to_the_end_has_no_sync_point() {
        let (list, ids) = list_of(&[(ATOMIC, 10), (ATOMIC, 10), (ATOMIC, 10)]);
        let d = compile(&list, 0, &DirtyRange::new(15, 15, 0)).unwrap();
        assert_eq!(d.first_affected, Some(ids[1]));
        assert_eq!(d.sync_point, None);
        assert_eq!(d.sync_start, None);
    }

    #[test]
    fn origin_offsets_absolute_ranges() {
        let (list, ids) = list_of(&[(ATOMIC, 10), (ATOMIC, 10)]);
        let d = compile(&list, 100, &DirtyRange::new(103, 1, 1)).unwrap();
        assert_eq!(d.first_affected, Some(ids[0]));
        assert_eq!(d.kind, ChangeKind::ModifiedInPlace);
        assert_eq!((d.first_start, d.sync_start), (0, Some(10)));
    }

    #[test]
    fn empty_list_compiles_to_append_at_zero() {
        let list: NodeList<()> = NodeList::new();
        let d = compile(&list, 40, &DirtyRange::new(40, 0, 3)).unwrap();
        assert_eq!(d, ChangeDescriptor::append(0, 3));
    }
}

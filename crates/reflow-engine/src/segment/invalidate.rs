use crate::error::{ReconcileError, Result};

use super::{Segment, StructuralMark};

impl<P> Segment<P> {
    /// Discards everything from the absolute content `position` onward.
    ///
    /// Returns `true` when the whole segment is gone and its host should
    /// discard the unit that owns it. A container covering `position` only
    /// survives if its nested segment keeps something before `position`.
    pub fn invalidate_from(&mut self, position: usize) -> Result<bool> {
        if self.cursor.is_some() {
            return Err(ReconcileError::PassInProgress);
        }
        if position <= self.origin {
            let disposed = self.list.clear();
            log::debug!(
                "segment at depth {} invalidated from {position}: all {disposed} unit(s) dropped",
                self.depth
            );
            self.retained.clear();
            self.mark(StructuralMark::Truncated);
            return Ok(true);
        }

        let relative = position - self.origin;
        let covering = self
            .list
            .iter()
            .find(|(_, unit)| unit.content_end() > relative)
            .map(|(id, _)| id);
        let Some(id) = covering else {
            return Ok(false);
        };

        let discard = match self.list.get_mut(id).and_then(|u| u.nested.as_deref_mut()) {
            Some(nested) => nested.invalidate_from(position)?,
            None => true,
        };
        if discard {
            let before = self.list.node(id)?.prev;
            let disposed = self.list.truncate_after(before)?;
            log::debug!(
                "segment at depth {} invalidated from {position}: {disposed} unit(s) dropped",
                self.depth
            );
            self.mark(StructuralMark::Truncated);
        } else {
            let disposed = self.list.truncate_after(Some(id))?;
            log::debug!(
                "segment at depth {} invalidated from {position}: kept {id:?}, {disposed} unit(s) dropped",
                self.depth
            );
            self.mark(StructuralMark::Retained(id));
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentSource;
    use crate::reconcile::{DirtyRange, FirstChange};
    use crate::units::{ChangeKind, UnitId, UnitKind, UnitSpec};
    use pretty_assertions::assert_eq;

    /// Top level: `[A(0,10), Q(10,20), C(30,10)]` where `Q` is a container
    /// holding two 10-long paragraphs.
    struct Quoted;

    impl ContentSource for Quoted {
        fn unit_at(&self, position: usize, depth: usize) -> Option<UnitSpec> {
            match (depth, position) {
                (0, p) if p < 10 => Some(UnitSpec::new(UnitKind::Paragraph, 10 - p)),
                (0, p) if p < 30 => Some(UnitSpec::new(UnitKind::Container, 30 - p)),
                (0, p) if p < 40 => Some(UnitSpec::new(UnitKind::Paragraph, 40 - p)),
                (1, p) if (10..20).contains(&p) => {
                    Some(UnitSpec::new(UnitKind::Paragraph, 20 - p))
                }
                (1, p) if (20..30).contains(&p) => {
                    Some(UnitSpec::new(UnitKind::Paragraph, 30 - p))
                }
                _ => None,
            }
        }
    }

    fn walk_all(segment: &mut Segment<()>, content: &Quoted, origin: usize) -> Vec<UnitId> {
        let mut ids = Vec::new();
        let mut pulled = segment.first(content).unwrap();
        while let Some(id) = pulled {
            let unit = segment.unit(id).unwrap();
            let (kind, start, len, change) = (
                unit.kind(),
                unit.content_start(),
                unit.formatted_length(),
                unit.change(),
            );
            if let Some(nested) = segment.nested_mut(id) {
                nested
                    .begin_pass(&Vec::<DirtyRange>::new(), origin + start)
                    .unwrap();
                walk_all(nested, content, origin + start);
            }
            if change != ChangeKind::Unchanged {
                segment.record_format(id, kind, len, ()).unwrap();
            }
            ids.push(id);
            pulled = segment.next(id, content).unwrap();
        }
        ids
    }

    fn formatted() -> (Segment<()>, Vec<UnitId>) {
        let mut segment = Segment::root();
        segment.begin_pass(&Vec::<DirtyRange>::new(), 0).unwrap();
        let ids = walk_all(&mut segment, &Quoted, 0);
        segment.clear_change_annotations().unwrap();
        (segment, ids)
    }

    #[test]
    fn nested_segments_are_positioned_after_the_first_pass() {
        let (segment, ids) = formatted();
        assert_eq!(ids.len(), 3);
        let nested = segment.unit(ids[1]).unwrap().nested().unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested.origin(), 10);
        assert_eq!(nested.total_length(), 20);
        assert_eq!(segment.structural_mark(), None);
        assert_eq!(nested.structural_mark(), None);
    }

    #[test]
    fn invalidating_at_the_origin_discards_everything() {
        let (mut segment, _) = formatted();
        assert!(segment.invalidate_from(0).unwrap());
        assert!(segment.is_empty());
        assert_eq!(segment.structural_mark(), Some(StructuralMark::Truncated));
    }

    #[test]
    fn invalidating_inside_a_leaf_discards_it_and_the_rest() {
        let (mut segment, ids) = formatted();
        assert!(!segment.invalidate_from(35).unwrap());
        assert_eq!(
            segment.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            vec![ids[0], ids[1]]
        );
        assert_eq!(segment.structural_mark(), Some(StructuralMark::Truncated));
    }

    #[test]
    fn invalidating_inside_a_container_keeps_its_prefix() {
        let (mut segment, ids) = formatted();
        assert!(!segment.invalidate_from(25).unwrap());
        assert_eq!(
            segment.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            vec![ids[0], ids[1]]
        );
        assert_eq!(
            segment.structural_mark(),
            Some(StructuralMark::Retained(ids[1]))
        );
        let nested = segment.unit(ids[1]).unwrap().nested().unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested.structural_mark(), Some(StructuralMark::Truncated));
    }

    #[test]
    fn invalidating_at_a_container_start_discards_the_container() {
        let (mut segment, ids) = formatted();
        assert!(!segment.invalidate_from(10).unwrap());
        assert_eq!(
            segment.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            vec![ids[0]]
        );
    }

    #[test]
    fn next_pass_rebuilds_what_was_invalidated() {
        let (mut segment, ids) = formatted();
        segment.invalidate_from(25).unwrap();

        let first = segment.begin_pass(&Vec::<DirtyRange>::new(), 0).unwrap();
        assert_eq!(first, FirstChange::After(ids[0]));
        let quote = segment.next(ids[0], &Quoted).unwrap().unwrap();
        assert_eq!(quote, ids[1]);
        assert_eq!(
            segment.unit(quote).unwrap().change(),
            ChangeKind::ModifiedInPlace
        );

        let nested = segment.nested_mut(quote).unwrap();
        let inner = nested.begin_pass(&Vec::<DirtyRange>::new(), 10).unwrap();
        assert!(matches!(inner, FirstChange::After(_)));
        let nested_ids = walk_all(nested, &Quoted, 10);
        assert_eq!(nested_ids.len(), 2);
        segment
            .record_format(quote, UnitKind::Container, 20, ())
            .unwrap();

        let tail = segment.next(quote, &Quoted).unwrap().unwrap();
        assert_eq!(segment.unit(tail).unwrap().change(), ChangeKind::Replaced);
        segment
            .record_format(tail, UnitKind::Paragraph, 10, ())
            .unwrap();
        assert_eq!(segment.next(tail, &Quoted).unwrap(), None);

        segment.clear_change_annotations().unwrap();
        assert_eq!(segment.len(), 3);
        assert_eq!(segment.structural_mark(), None);
        assert_eq!(segment.total_length(), 40);
    }

    #[test]
    fn invalidation_is_refused_during_a_pass() {
        let (mut segment, _) = formatted();
        segment.begin_pass(&Vec::<DirtyRange>::new(), 0).unwrap();
        assert!(matches!(
            segment.invalidate_from(5),
            Err(ReconcileError::PassInProgress)
        ));
    }

    #[test]
    fn unfinished_nested_pass_marks_its_container() {
        let (mut segment, ids) = formatted();
        segment.invalidate_from(25).unwrap();
        segment.begin_pass(&Vec::<DirtyRange>::new(), 0).unwrap();
        let quote = segment.next(ids[0], &Quoted).unwrap().unwrap();
        // The consumer starts on the nested segment but gives up right away
        let nested = segment.nested_mut(quote).unwrap();
        nested.begin_pass(&Vec::<DirtyRange>::new(), 10).unwrap();
        segment
            .record_format(quote, UnitKind::Container, 20, ())
            .unwrap();
        segment.clear_change_annotations().unwrap();
        assert_eq!(
            segment.structural_mark(),
            Some(StructuralMark::Retained(quote))
        );
    }

    #[test]
    fn unfinished_nested_pass_keeps_what_follows_its_container() {
        let (mut segment, ids) = formatted();
        let edit = vec![DirtyRange::new(12, 1, 1)];
        segment.begin_pass(&edit, 0).unwrap();
        let quote = segment.next(ids[0], &Quoted).unwrap().unwrap();
        assert_eq!(quote, ids[1]);
        assert!(segment.unit(quote).unwrap().no_further_changes());
        // Nothing inside the quote is pulled before the pass ends
        let nested = segment.nested_mut(quote).unwrap();
        nested.begin_pass(&edit, 10).unwrap();
        segment
            .record_format(quote, UnitKind::Container, 20, ())
            .unwrap();
        assert_eq!(segment.next(quote, &Quoted).unwrap(), Some(ids[2]));
        segment.clear_change_annotations().unwrap();
        assert_eq!(
            segment.structural_mark(),
            Some(StructuralMark::Retained(quote))
        );
        assert_eq!(segment.len(), 3);

        let first = segment.begin_pass(&Vec::<DirtyRange>::new(), 0).unwrap();
        assert_eq!(first, FirstChange::After(ids[0]));
        let seen = walk_all(&mut segment, &Quoted, 0);
        assert_eq!(seen, ids);
        let stats = segment.clear_change_annotations().unwrap();
        assert_eq!(stats.disposed, 0);
        assert_eq!(stats.fabricated, 2);
        assert_eq!(segment.structural_mark(), None);
        assert_eq!(segment.unit(quote).unwrap().nested().unwrap().len(), 2);
    }
}

use slotmap::SlotMap;

use crate::error::{ReconcileError, Result};

use super::unit::{LayoutUnit, UnitId};

/// Ordered, doubly linked cache of layout units.
///
/// Units live in a generational arena and are linked through their
/// `prev`/`next` handles. Removing a run of units rewrites only the two links
/// at the run's boundaries, so surgery costs O(run length) regardless of the
/// size of the list.
pub struct NodeList<P> {
    slots: SlotMap<UnitId, LayoutUnit<P>>,
    head: Option<UnitId>,
    tail: Option<UnitId>,
}

impl<P> Default for NodeList<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> NodeList<P> {
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    pub fn head(&self) -> Option<UnitId> {
        self.head
    }

    pub fn tail(&self) -> Option<UnitId> {
        self.tail
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn get(&self, id: UnitId) -> Option<&LayoutUnit<P>> {
        self.slots.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut LayoutUnit<P>> {
        self.slots.get_mut(id)
    }

    /// Like [`get`](Self::get), but a missing unit is a [`ReconcileError::StaleUnit`].
    pub(crate) fn node(&self, id: UnitId) -> Result<&LayoutUnit<P>> {
        self.slots.get(id).ok_or(ReconcileError::StaleUnit(id))
    }

    pub(crate) fn node_mut(&mut self, id: UnitId) -> Result<&mut LayoutUnit<P>> {
        self.slots.get_mut(id).ok_or(ReconcileError::StaleUnit(id))
    }

    pub fn next_of(&self, id: UnitId) -> Option<UnitId> {
        self.slots.get(id).and_then(|u| u.next)
    }

    pub fn prev_of(&self, id: UnitId) -> Option<UnitId> {
        self.slots.get(id).and_then(|u| u.prev)
    }

    /// Sum of the formatted lengths of every unit.
    pub fn total_length(&self) -> usize {
        self.iter().map(|(_, u)| u.formatted_length).sum()
    }

    pub fn iter(&self) -> Iter<'_, P> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Links `unit` directly after `after`, or at the head when `after` is `None`.
    pub(crate) fn insert_after(
        &mut self,
        after: Option<UnitId>,
        mut unit: LayoutUnit<P>,
    ) -> Result<UnitId> {
        let next = match after {
            Some(a) => self.node(a)?.next,
            None => self.head,
        };
        unit.prev = after;
        unit.next = next;
        let id = self.slots.insert(unit);

        match after {
            Some(a) => self.node_mut(a)?.next = Some(id),
            None => self.head = Some(id),
        }
        match next {
            Some(n) => self.node_mut(n)?.prev = Some(id),
            None => self.tail = Some(id),
        }
        Ok(id)
    }

    /// Unlinks and destroys every unit from `first` up to but excluding
    /// `until` (to the end of the list when `until` is `None`).
    ///
    /// The run is verified before anything is unlinked, so a `until` that is
    /// not reachable from `first` leaves the list untouched.
    pub(crate) fn dispose_range(&mut self, first: UnitId, until: Option<UnitId>) -> Result<usize> {
        let mut doomed = Vec::new();
        let mut cursor = Some(first);
        while cursor != until {
            let Some(id) = cursor else {
                // `cursor` ran off the end while `until` is still ahead of us
                return Err(ReconcileError::BrokenChain {
                    first,
                    until: until.unwrap_or(first),
                });
            };
            doomed.push(id);
            cursor = self.node(id)?.next;
        }
        if doomed.is_empty() {
            return Ok(0);
        }

        let before = self.node(first)?.prev;
        self.relink(before, until)?;
        for id in &doomed {
            self.slots.remove(*id);
            log::trace!("disposed unit {id:?}");
        }
        Ok(doomed.len())
    }

    /// Destroys everything after `after` (the whole list when `None`).
    pub(crate) fn truncate_after(&mut self, after: Option<UnitId>) -> Result<usize> {
        let first = match after {
            Some(a) => self.node(a)?.next,
            None => self.head,
        };
        match first {
            Some(first) => self.dispose_range(first, None),
            None => Ok(0),
        }
    }

    /// Destroys every unit.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.slots.len();
        self.slots.clear();
        self.head = None;
        self.tail = None;
        count
    }

    /// Verifies `next.content_start == prev.content_start + prev.formatted_length`
    /// for every adjacent pair, with the head starting at zero.
    pub fn check_contiguous(&self) -> Result<()> {
        let mut expected = 0;
        let mut previous = None;
        for (id, unit) in self.iter() {
            if unit.content_start != expected || unit.prev != previous {
                return Err(ReconcileError::Discontinuity {
                    unit: id,
                    expected,
                    found: unit.content_start,
                });
            }
            expected += unit.formatted_length;
            previous = Some(id);
        }
        Ok(())
    }

    fn relink(&mut self, before: Option<UnitId>, after: Option<UnitId>) -> Result<()> {
        match before {
            Some(b) => self.node_mut(b)?.next = after,
            None => self.head = after,
        }
        match after {
            Some(a) => self.node_mut(a)?.prev = before,
            None => self.tail = before,
        }
        Ok(())
    }
}

/// Iterator over `(UnitId, &LayoutUnit)` in content order.
pub struct Iter<'a, P> {
    list: &'a NodeList<P>,
    cursor: Option<UnitId>,
}

impl<'a, P> Iterator for Iter<'a, P> {
    type Item = (UnitId, &'a LayoutUnit<P>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let unit = self.list.slots.get(id)?;
        self.cursor = unit.next;
        Some((id, unit))
    }
}

//! # Segments
//!
//! A `Segment` owns the cached node list for one run of content (the whole
//! document, or the inside of a container unit) and drives formatting
//! passes over it.
//!
//! A pass goes through three stages:
//!
//! 1. [`Segment::begin_pass`] compiles and merges the pending edits into
//!    change islands and reports where the first change is
//! 2. the consumer pulls units with [`Segment::first`] and [`Segment::next`],
//!    which reuse, flag, dispose or fabricate units as the walk crosses the
//!    islands
//! 3. [`Segment::clear_change_annotations`] ends the pass and puts the list
//!    back into its cached, contiguous state
//!
//! [`Segment::invalidate_from`] is the coarse alternative for changes that
//! cannot be described as dirty ranges.

mod invalidate;
mod pull;

use crate::error::{ReconcileError, Result};
use crate::reconcile::{
    ChangeDescriptor, DirtyRangeTracker, FirstChange, PassStats, ReconciliationCursor, compile,
    merge, validate,
};
use crate::units::{ChangeKind, Iter, LayoutUnit, NodeList, UnitId, UnitKind};

/// Structural damage left behind by invalidation or an unfinished pass.
///
/// The next pass turns it into a change island, so consumers that stop at
/// the first unchanged unit still rebuild what was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralMark {
    /// Units were destroyed from some point to the end of the list.
    Truncated,
    /// This unit survived, but everything inside or after it was destroyed.
    Retained(UnitId),
}

pub struct Segment<P> {
    list: NodeList<P>,
    depth: usize,
    /// Absolute position of the first unit in cached coordinates.
    origin: usize,
    /// Absolute position of the first unit in the coordinates of the pass
    /// in progress.
    pass_origin: usize,
    cursor: Option<ReconciliationCursor>,
    /// Units kept across structural damage; each one is revisited next pass.
    retained: Vec<UnitId>,
    /// Units were destroyed at the end of the list.
    truncated: bool,
}

impl<P> Segment<P> {
    /// The top-level segment of a document.
    pub fn root() -> Self {
        Self::nested(0)
    }

    /// An empty segment at `depth`.
    ///
    /// A new segment has never been formatted, so it starts out truncated:
    /// its first pass reports a change even with no edits pending.
    pub fn nested(depth: usize) -> Self {
        Self {
            list: NodeList::new(),
            depth,
            origin: 0,
            pass_origin: 0,
            cursor: None,
            retained: Vec::new(),
            truncated: true,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn origin(&self) -> usize {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn total_length(&self) -> usize {
        self.list.total_length()
    }

    pub fn list(&self) -> &NodeList<P> {
        &self.list
    }

    pub fn iter(&self) -> Iter<'_, P> {
        self.list.iter()
    }

    pub fn unit(&self, id: UnitId) -> Result<&LayoutUnit<P>> {
        self.list.node(id)
    }

    pub fn nested_mut(&mut self, id: UnitId) -> Option<&mut Segment<P>> {
        self.list.get_mut(id).and_then(|unit| unit.nested.as_deref_mut())
    }

    /// The earliest structural damage waiting for the next pass.
    pub fn structural_mark(&self) -> Option<StructuralMark> {
        let earliest = self
            .retained
            .iter()
            .filter_map(|&id| self.list.get(id).map(|unit| (unit.content_start, id)))
            .min();
        match earliest {
            Some((_, id)) => Some(StructuralMark::Retained(id)),
            None if self.truncated => Some(StructuralMark::Truncated),
            None => None,
        }
    }

    fn is_damaged(&self) -> bool {
        self.structural_mark().is_some()
    }

    pub fn in_pass(&self) -> bool {
        self.cursor.is_some()
    }

    /// The cursor of the pass in progress.
    pub fn cursor(&self) -> Option<&ReconciliationCursor> {
        self.cursor.as_ref()
    }

    /// Starts a formatting pass.
    ///
    /// `tracker` is asked for the dirty ranges touching this segment's
    /// cached extent. `origin` is where the segment starts in the edited
    /// content. Nothing is touched when the ranges are rejected or fail to
    /// compile.
    pub fn begin_pass<T>(&mut self, tracker: &T, origin: usize) -> Result<FirstChange>
    where
        T: DirtyRangeTracker + ?Sized,
    {
        if self.cursor.is_some() {
            return Err(ReconcileError::PassInProgress);
        }
        // The top-level segment also owns everything past its last unit
        let end = match self.depth {
            0 => usize::MAX,
            _ => self.origin + self.list.total_length(),
        };
        let extent = self.origin..end;
        // An edit ending exactly on our start belongs to whatever precedes us
        let ranges: Vec<_> = tracker
            .dirty_ranges(extent)
            .into_iter()
            .filter(|range| range.start >= self.origin)
            .collect();
        validate(&ranges)?;

        let mut chain = ranges
            .iter()
            .map(|range| compile(&self.list, self.origin, range))
            .collect::<Result<Vec<_>>>()?;
        for structural in self.structural_descriptors() {
            let at = chain.partition_point(|d| d.first_start <= structural.first_start);
            chain.insert(at, structural);
        }
        let pending = merge(chain);

        let first_change = match pending.front() {
            None => FirstChange::Unchanged,
            Some(ChangeDescriptor {
                first_affected: Some(first),
                ..
            }) => match self.list.prev_of(*first) {
                Some(before) => FirstChange::After(before),
                None => FirstChange::AtStart,
            },
            Some(_) => match self.list.tail() {
                Some(tail) => FirstChange::After(tail),
                None => FirstChange::AtStart,
            },
        };
        log::debug!(
            "pass begins at depth {} (origin {} -> {}): {} dirty range(s), {} island(s), {:?}",
            self.depth,
            self.origin,
            origin,
            ranges.len(),
            pending.len(),
            first_change
        );

        self.retained.clear();
        self.truncated = false;
        self.pass_origin = origin;
        self.cursor = Some(ReconciliationCursor::new(pending, first_change));
        Ok(first_change)
    }

    /// Where the first change of the pass in progress lies.
    pub fn first_change_before_pull(&self) -> Result<FirstChange> {
        self.cursor
            .as_ref()
            .and_then(|cursor| cursor.first_change)
            .ok_or(ReconcileError::NoPassInProgress)
    }

    /// Stores the consumer's formatting result for a unit.
    ///
    /// A unit that changes kind gets a fresh nested segment (or loses its
    /// old one).
    pub fn record_format(
        &mut self,
        id: UnitId,
        kind: UnitKind,
        formatted_length: usize,
        payload: P,
    ) -> Result<()> {
        let nested_depth = self.depth + 1;
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.unformatted.retain(|&pending| pending != id);
        }
        let unit = self.list.node_mut(id)?;
        if unit.kind != kind {
            unit.nested = kind
                .is_container()
                .then(|| Box::new(Segment::nested(nested_depth)));
        }
        unit.kind = kind;
        unit.formatted_length = formatted_length;
        unit.payload = Some(payload);
        Ok(())
    }

    /// Ends the pass: every annotation goes back to `Unchanged`, positions
    /// are re-threaded from the origin, and units whose formatted length
    /// collapsed to zero are dropped. Nested segments are ended too.
    ///
    /// Work the consumer never pulled, and changed units it pulled but never
    /// recorded a format for, are torn down and remembered as a structural
    /// mark. Clearing with no pass in progress only re-threads.
    pub fn clear_change_annotations(&mut self) -> Result<PassStats> {
        Ok(self.end_pass()?.unwrap_or_default())
    }

    /// Cancels the pass in progress. Same cleanup as
    /// [`clear_change_annotations`](Self::clear_change_annotations).
    pub fn abandon_pass(&mut self) -> Result<()> {
        if self.cursor.is_some() {
            log::debug!("pass abandoned at depth {}", self.depth);
        }
        self.end_pass().map(|_| ())
    }

    /// Destroys every unit and any pass state.
    pub fn reset(&mut self) {
        let disposed = self.list.clear();
        log::debug!("segment at depth {} reset ({disposed} unit(s))", self.depth);
        self.cursor = None;
        self.retained.clear();
        self.truncated = true;
    }

    fn end_pass(&mut self) -> Result<Option<PassStats>> {
        let ended = match self.cursor.take() {
            Some(cursor) => {
                let mut stats = cursor.stats();
                let mut keep = (!cursor.exhausted())
                    .then(|| cursor.last_returned().or(cursor.resume_anchor()));
                let unformatted: Vec<UnitId> = cursor
                    .unformatted
                    .iter()
                    .copied()
                    .filter(|&id| self.list.contains(id))
                    .collect();
                let mut stale = None;
                if let Some(&first) = unformatted.first() {
                    let unit = self.list.node(first)?;
                    // A lone kept unit can be revisited, unless it is a
                    // container whose nested segment never saw the edits
                    let revisitable = unit.change == ChangeKind::ModifiedInPlace
                        && unformatted.len() == 1
                        && unit.nested.as_deref().is_none_or(|nested| nested.in_pass());
                    if revisitable {
                        stale = Some(first);
                    } else {
                        keep = Some(unit.prev);
                    }
                }
                if let Some(keep) = keep {
                    let disposed = self.list.truncate_after(keep)?;
                    log::debug!(
                        "pass at depth {} ended with unresolved changes; {disposed} unit(s) after {keep:?} dropped",
                        self.depth
                    );
                    stats.disposed += disposed;
                    self.mark(StructuralMark::Truncated);
                }
                if let Some(id) = stale {
                    log::debug!("unit {id:?} was pulled but never formatted");
                    self.mark(StructuralMark::Retained(id));
                }
                self.origin = self.pass_origin;
                Some(stats)
            }
            None => None,
        };
        let nested = self.rethread()?;
        Ok(ended.map(|mut stats| {
            stats += nested;
            stats
        }))
    }

    /// Restores contiguity from the origin and ends nested passes.
    fn rethread(&mut self) -> Result<PassStats> {
        let mut stats = PassStats::default();
        let mut unfinished = Vec::new();
        let mut position = 0;
        let mut cursor = self.list.head();
        while let Some(id) = cursor {
            let unit = self.list.node_mut(id)?;
            let next = unit.next;
            if unit.formatted_length == 0 {
                stats.disposed += self.list.dispose_range(id, next)?;
                cursor = next;
                continue;
            }
            unit.content_start = position;
            unit.change = ChangeKind::Unchanged;
            unit.no_further_changes = false;
            if let Some(nested) = unit.nested.as_deref_mut() {
                nested.origin = self.origin + position;
                nested.pass_origin = nested.origin;
                if let Some(inner) = nested.end_pass()? {
                    stats += inner;
                    if nested.is_damaged() {
                        unfinished.push(id);
                    }
                }
            }
            position += unit.formatted_length;
            cursor = next;
        }
        for id in unfinished {
            self.mark(StructuralMark::Retained(id));
        }
        if cfg!(debug_assertions) {
            self.list.check_contiguous()?;
        }
        Ok(stats)
    }

    /// Records structural damage for the next pass.
    pub(crate) fn mark(&mut self, mark: StructuralMark) {
        match mark {
            StructuralMark::Truncated => self.truncated = true,
            StructuralMark::Retained(id) if !self.retained.contains(&id) => self.retained.push(id),
            StructuralMark::Retained(_) => {}
        }
    }

    /// One island per retained unit, ending at its successor, plus an
    /// append when the tail was truncated. Retained units that have since
    /// been destroyed were covered by a truncation.
    fn structural_descriptors(&self) -> Vec<ChangeDescriptor> {
        let mut descriptors: Vec<ChangeDescriptor> = self
            .retained
            .iter()
            .filter_map(|&id| {
                let unit = self.list.get(id)?;
                let sync_point = unit.next;
                Some(ChangeDescriptor {
                    kind: ChangeKind::ModifiedInPlace,
                    first_affected: Some(id),
                    sync_point,
                    first_start: unit.content_start,
                    sync_start: sync_point.map(|_| unit.content_end()),
                    net: 0,
                })
            })
            .collect();
        descriptors.sort_by_key(|d| d.first_start);
        if self.truncated {
            descriptors.push(ChangeDescriptor::append(self.list.total_length(), 0));
        }
        descriptors
    }

    fn cursor_mut(&mut self) -> Result<&mut ReconciliationCursor> {
        self.cursor.as_mut().ok_or(ReconcileError::NoPassInProgress)
    }
}

impl<P> Default for Segment<P> {
    fn default() -> Self {
        Self::root()
    }
}

impl<P> std::fmt::Debug for Segment<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("depth", &self.depth)
            .field("origin", &self.origin)
            .field("units", &self.list.len())
            .field("in_pass", &self.cursor.is_some())
            .field("structural", &self.structural_mark())
            .finish()
    }
}

use crate::content::ContentSource;
use crate::error::{ReconcileError, Result};
use crate::reconcile::ChangeDescriptor;
use crate::reconcile::cursor::{ActiveIsland, shifted};
use crate::units::{ChangeKind, LayoutUnit, UnitId};

use super::Segment;

impl<P> Segment<P> {
    /// Hands the consumer the first unit of the segment.
    pub fn first<C>(&mut self, content: &C) -> Result<Option<UnitId>>
    where
        C: ContentSource + ?Sized,
    {
        let cursor = self.cursor_mut()?;
        if let Some(last) = cursor.last_returned() {
            return Err(ReconcileError::OutOfOrder {
                expected: Some(last),
                got: None,
            });
        }
        let pulled = self.settle(None, 0, content);
        self.abort_on_violation(pulled)
    }

    /// Hands the consumer the unit after `previous`.
    ///
    /// `previous` must be the unit returned by the last pull, or, before
    /// anything was pulled, the anchor of [`FirstChange::After`].
    ///
    /// [`FirstChange::After`]: crate::reconcile::FirstChange::After
    pub fn next<C>(&mut self, previous: UnitId, content: &C) -> Result<Option<UnitId>>
    where
        C: ContentSource + ?Sized,
    {
        let cursor = self.cursor_mut()?;
        let expected = cursor.last_returned().or(cursor.resume_anchor());
        if let Some(expected) = expected
            && expected != previous
        {
            return Err(ReconcileError::OutOfOrder {
                expected: Some(expected),
                got: Some(previous),
            });
        }
        let at = self.list.node(previous)?.content_end();
        let pulled = self.settle(Some(previous), at, content);
        self.abort_on_violation(pulled)
    }

    fn abort_on_violation(&mut self, pulled: Result<Option<UnitId>>) -> Result<Option<UnitId>> {
        if let Err(err) = &pulled
            && err.is_invariant_violation()
        {
            log::warn!("pass at depth {} aborted: {err}", self.depth);
            self.reset();
        }
        pulled
    }

    /// Decides what the walk yields at `at`, the new-coordinate position
    /// right after `prev`.
    fn settle<C>(&mut self, prev: Option<UnitId>, at: usize, content: &C) -> Result<Option<UnitId>>
    where
        C: ContentSource + ?Sized,
    {
        loop {
            let candidate = match prev {
                Some(prev) => self.list.node(prev)?.next,
                None => self.list.head(),
            };

            let active = self.cursor_mut()?.active;
            if let Some(island) = active {
                match island.sync {
                    Some(sync) if island.delivered && at > island.resume_at => {
                        self.overrun(sync)?;
                        continue;
                    }
                    Some(sync) if island.delivered && at == island.resume_at => {
                        log::trace!("island closes at {sync:?}");
                        self.cursor_mut()?.active = None;
                    }
                    _ => return self.fabricate(prev, at, content),
                }
            }

            let cursor = self.cursor_mut()?;
            let head = cursor.pending.front().map(|desc| desc.first_affected);
            match head {
                Some(first) if first == candidate => {
                    if let Some(desc) = cursor.pending.pop_front()
                        && let Some(kept) = self.apply(desc, at, content)?
                    {
                        return self.deliver(kept, at);
                    }
                    continue;
                }
                Some(Some(first)) if candidate.is_none() => {
                    return Err(ReconcileError::DetachedDescriptor(first));
                }
                _ => {}
            }

            return match candidate {
                Some(id) => {
                    self.list.node_mut(id)?.change = ChangeKind::Unchanged;
                    self.deliver(id, at)
                }
                None => Ok(None),
            };
        }
    }

    /// Opens the island described by `desc`. Returns the kept first unit of
    /// a `ModifiedInPlace` island; `Replaced` islands continue by fabrication.
    fn apply<C>(&mut self, desc: ChangeDescriptor, at: usize, content: &C) -> Result<Option<UnitId>>
    where
        C: ContentSource + ?Sized,
    {
        let cursor = self.cursor_mut()?;
        cursor.shift += desc.net;
        cursor.stats.islands += 1;
        let resume_at = match desc.sync_start {
            Some(start) => shifted(start, cursor.shift)?,
            None => 0,
        };
        log::debug!(
            "island at {} ({:?}, sync {:?}) resumes at {resume_at}",
            desc.first_start,
            desc.kind,
            desc.sync_point
        );

        let Some(first) = desc.first_affected else {
            cursor.active = Some(ActiveIsland {
                sync: None,
                resume_at,
                delivered: false,
            });
            return Ok(None);
        };

        if desc.kind == ChangeKind::ModifiedInPlace {
            let unit = self.list.node(first)?;
            let kind = unit.kind;
            let after = unit.next;
            let spec = content
                .unit_at(self.pass_origin + at, self.depth)
                .filter(|spec| spec.length > 0 && spec.kind == kind);
            if let Some(spec) = spec {
                let disposed = match after {
                    Some(after) => self.list.dispose_range(after, desc.sync_point)?,
                    None => 0,
                };
                let unit = self.list.node_mut(first)?;
                unit.formatted_length = spec.length;
                unit.change = ChangeKind::ModifiedInPlace;
                let cursor = self.cursor_mut()?;
                cursor.stats.disposed += disposed;
                // Ending right on the sync point settles the island already
                let settled = desc.sync_point.is_some() && at + spec.length == resume_at;
                cursor.active = (!settled).then_some(ActiveIsland {
                    sync: desc.sync_point,
                    resume_at,
                    delivered: true,
                });
                return Ok(Some(first));
            }
            log::debug!("unit {first:?} no longer matches its content; replacing it");
        }

        let disposed = self.list.dispose_range(first, desc.sync_point)?;
        let cursor = self.cursor_mut()?;
        cursor.stats.disposed += disposed;
        cursor.active = Some(ActiveIsland {
            sync: desc.sync_point,
            resume_at,
            delivered: false,
        });
        Ok(None)
    }

    /// Fabricated content ran past the sync point's new start, so the sync
    /// unit is stale. The next unit takes over as sync point; if that unit
    /// opens the next island, the two islands become one.
    fn overrun(&mut self, sync: UnitId) -> Result<()> {
        let unit = self.list.node(sync)?;
        let length = unit.formatted_length;
        let after = unit.next;
        let mut disposed = self.list.dispose_range(sync, after)?;
        log::trace!("sync point {sync:?} overrun by fabricated content");

        let cursor = self.cursor_mut()?;
        let mut island = cursor.active.unwrap_or(ActiveIsland {
            sync: None,
            resume_at: 0,
            delivered: true,
        });
        island.sync = after;
        island.resume_at += length;

        let absorbs = cursor
            .pending
            .front()
            .is_some_and(|desc| desc.first_affected == after);
        let absorbed = if absorbs {
            cursor.pending.pop_front()
        } else {
            None
        };
        if let Some(desc) = absorbed {
            cursor.shift += desc.net;
            cursor.stats.islands += 1;
            island.sync = desc.sync_point;
            island.resume_at = match desc.sync_start {
                Some(start) => shifted(start, cursor.shift)?,
                None => 0,
            };
            if let Some(first) = desc.first_affected {
                disposed += self.list.dispose_range(first, desc.sync_point)?;
            }
        }

        let cursor = self.cursor_mut()?;
        cursor.stats.disposed += disposed;
        cursor.active = Some(island);
        Ok(())
    }

    /// Creates a unit from the content at `at` and links it after `prev`.
    fn fabricate<C>(&mut self, prev: Option<UnitId>, at: usize, content: &C) -> Result<Option<UnitId>>
    where
        C: ContentSource + ?Sized,
    {
        let spec = content
            .unit_at(self.pass_origin + at, self.depth)
            .filter(|spec| spec.length > 0);
        let Some(spec) = spec else {
            return self.content_exhausted(prev);
        };
        let unit = LayoutUnit::fabricated(spec, at, self.depth + 1);
        let id = self.list.insert_after(prev, unit)?;
        log::trace!("fabricated {:?} unit {id:?} at {at} ({} long)", spec.kind, spec.length);

        let cursor = self.cursor_mut()?;
        cursor.stats.fabricated += 1;
        if let Some(island) = cursor.active.as_mut() {
            island.delivered = true;
        }
        self.deliver(id, at)
    }

    /// The content tree ended inside an island: the segment ends here.
    fn content_exhausted(&mut self, prev: Option<UnitId>) -> Result<Option<UnitId>> {
        let cursor = self.cursor_mut()?;
        let island = cursor.active.take();
        if island.is_some_and(|island| island.sync.is_some()) {
            cursor.pending.clear();
            let disposed = self.list.truncate_after(prev)?;
            log::debug!("content ended before the sync point; {disposed} unit(s) dropped");
            self.cursor_mut()?.stats.disposed += disposed;
        }
        Ok(None)
    }

    fn deliver(&mut self, id: UnitId, at: usize) -> Result<Option<UnitId>> {
        let cursor = self
            .cursor
            .as_mut()
            .ok_or(ReconcileError::NoPassInProgress)?;
        let unit = self.list.node_mut(id)?;
        unit.content_start = at;
        unit.no_further_changes = cursor.exhausted();
        match unit.change {
            ChangeKind::Unchanged => cursor.stats.reused += 1,
            ChangeKind::ModifiedInPlace => cursor.stats.modified += 1,
            ChangeKind::Replaced => {}
        }
        if unit.change != ChangeKind::Unchanged {
            cursor.unformatted.push(id);
        }
        cursor.last_returned = Some(id);
        Ok(Some(id))
    }
}

use std::cell::Cell;
use std::sync::Arc;

use serde::Serialize;
use xi_rope::Rope;

use crate::content::BlockContent;
use crate::editing::wrap::{FormattedBlock, LineWrapper};
use crate::error::Result;
use crate::reconcile::{DirtyRange, DirtyRangeTracker, FirstChange, PassStats};
use crate::segment::Segment;
use crate::units::{ChangeKind, UnitId, UnitKind};

/// What a document's layout caches per unit.
pub type Payload = Arc<FormattedBlock>;

/// Outcome of one reflow of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReflowReport {
    /// Where the top-level segment reported its first change.
    #[serde(skip)]
    pub first_change: Option<FirstChange>,
    pub stats: PassStats,
    /// Units handed out by pulls, at every depth.
    pub pulled: usize,
    /// Leaf units whose text went through the wrapper.
    pub formatted: usize,
}

/// A consumer that walks a layout the way a renderer would: it starts at
/// the first change, reformats whatever is not `Unchanged`, descends into
/// changed containers and stops as soon as the segment has no further
/// changes.
pub(crate) struct Reflow<'a> {
    pub edits: &'a dyn DirtyRangeTracker,
    pub content: &'a BlockContent,
    pub buffer: &'a Rope,
    pub wrapper: LineWrapper,
    /// Pulls left before the walk gives up; `None` walks to the end.
    pub budget: Cell<Option<usize>>,
}

impl Reflow<'_> {
    pub(crate) fn run(&self, layout: &mut Segment<Payload>, report: &mut ReflowReport) -> Result<()> {
        report.first_change = Some(self.segment(layout, self.edits, 0, report)?);
        Ok(())
    }

    fn segment(
        &self,
        segment: &mut Segment<Payload>,
        tracker: &dyn DirtyRangeTracker,
        origin: usize,
        report: &mut ReflowReport,
    ) -> Result<FirstChange> {
        let first_change = segment.begin_pass(tracker, origin)?;
        let mut pulled = match first_change {
            FirstChange::Unchanged => return Ok(first_change),
            FirstChange::AtStart => segment.first(self.content)?,
            FirstChange::After(anchor) => segment.next(anchor, self.content)?,
        };

        while let Some(id) = pulled {
            if !self.spend() {
                log::debug!("reflow budget spent at depth {}", segment.depth());
                break;
            }
            report.pulled += 1;
            let unit = segment.unit(id)?;
            let kind = unit.kind();
            let change = unit.change();
            let start = origin + unit.content_start();
            let len = unit.formatted_length();
            let done = unit.no_further_changes();

            if change != ChangeKind::Unchanged {
                log::trace!("reformatting {kind:?} at {start}..{} ({change:?})", start + len);
                let block = self.format(segment, id, kind, change, start, len, report)?;
                // A container whose nested walk ran out of budget stays unformatted
                if kind.is_container() && self.budget.get() == Some(0) {
                    break;
                }
                segment.record_format(id, kind, len, Arc::new(block))?;
            }
            if done {
                break;
            }
            pulled = segment.next(id, self.content)?;
        }
        Ok(first_change)
    }

    /// Takes one pull from the budget; false once it has run out.
    fn spend(&self) -> bool {
        match self.budget.get() {
            None => true,
            Some(0) => false,
            Some(left) => {
                self.budget.set(Some(left - 1));
                true
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn format(
        &self,
        segment: &mut Segment<Payload>,
        id: UnitId,
        kind: UnitKind,
        change: ChangeKind,
        start: usize,
        len: usize,
        report: &mut ReflowReport,
    ) -> Result<FormattedBlock> {
        if !kind.is_container() {
            report.formatted += 1;
            let end = (start + len).min(self.buffer.len());
            let text = self.buffer.slice_to_cow(start.min(end)..end);
            return Ok(self.wrapper.format(&text, kind));
        }

        let Some(nested) = segment.nested_mut(id) else {
            return Ok(FormattedBlock { lines: 0 });
        };
        // A fabricated container has no cached content for edits to land in
        let untouched: Vec<DirtyRange> = Vec::new();
        let tracker: &dyn DirtyRangeTracker = match change {
            ChangeKind::Replaced => &untouched,
            _ => self.edits,
        };
        self.segment(nested, tracker, start, report)?;
        let lines = nested
            .iter()
            .filter_map(|(_, unit)| unit.payload())
            .map(|block| block.lines)
            .sum();
        Ok(FormattedBlock { lines })
    }
}

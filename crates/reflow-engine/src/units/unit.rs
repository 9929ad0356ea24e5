use serde::Serialize;

use crate::segment::Segment;

slotmap::new_key_type! {
    /// Generational handle to a layout unit.
    ///
    /// A handle to a disposed unit never resolves again, even if its slot is
    /// reused by a later fabrication.
    pub struct UnitId;
}

/// What kind of layout unit a span of content produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnitKind {
    /// Running text. The splittable kind: its content can continue across
    /// an edit boundary that lands exactly on its end.
    Paragraph,
    /// Content formatted as one indivisible block (fenced code and the like).
    Atomic,
    /// A unit whose content is itself a nested segment of units.
    Container,
}

impl UnitKind {
    /// Whether an edit landing exactly on this unit's end still belongs to it.
    #[must_use]
    pub fn is_splittable(self) -> bool {
        matches!(self, UnitKind::Paragraph)
    }

    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, UnitKind::Container)
    }
}

/// Classification of a unit for the pass in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ChangeKind {
    /// Cached formatting is valid as-is.
    #[default]
    Unchanged,
    /// The unit was kept but its content changed; the consumer must
    /// recompute its formatting.
    ModifiedInPlace,
    /// The unit is new (fabricated) and has never been formatted.
    Replaced,
}

/// Kind and nominal length of a unit as reported by the content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpec {
    pub kind: UnitKind,
    pub length: usize,
}

impl UnitSpec {
    pub fn new(kind: UnitKind, length: usize) -> Self {
        Self { kind, length }
    }
}

/// The cached formatting result for one contiguous span of content.
pub struct LayoutUnit<P> {
    pub(crate) kind: UnitKind,
    /// Relative to the owning segment's origin.
    pub(crate) content_start: usize,
    pub(crate) formatted_length: usize,
    pub(crate) payload: Option<P>,
    pub(crate) change: ChangeKind,
    pub(crate) no_further_changes: bool,
    pub(crate) nested: Option<Box<Segment<P>>>,
    pub(crate) prev: Option<UnitId>,
    pub(crate) next: Option<UnitId>,
}

impl<P> LayoutUnit<P> {
    pub(crate) fn fabricated(spec: UnitSpec, content_start: usize, nested_depth: usize) -> Self {
        Self {
            kind: spec.kind,
            content_start,
            formatted_length: spec.length,
            payload: None,
            change: ChangeKind::Replaced,
            no_further_changes: false,
            nested: spec
                .kind
                .is_container()
                .then(|| Box::new(Segment::nested(nested_depth))),
            prev: None,
            next: None,
        }
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn content_start(&self) -> usize {
        self.content_start
    }

    pub fn formatted_length(&self) -> usize {
        self.formatted_length
    }

    /// End of the cached span, relative to the segment origin.
    pub fn content_end(&self) -> usize {
        self.content_start + self.formatted_length
    }

    pub fn payload(&self) -> Option<&P> {
        self.payload.as_ref()
    }

    pub fn change(&self) -> ChangeKind {
        self.change
    }

    /// Set once the pending change chain is exhausted: nothing after this
    /// unit changed in the current pass.
    pub fn no_further_changes(&self) -> bool {
        self.no_further_changes
    }

    pub fn nested(&self) -> Option<&Segment<P>> {
        self.nested.as_deref()
    }

    pub fn previous(&self) -> Option<UnitId> {
        self.prev
    }

    pub fn next(&self) -> Option<UnitId> {
        self.next
    }
}

impl<P> std::fmt::Debug for LayoutUnit<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutUnit")
            .field("kind", &self.kind)
            .field("content_start", &self.content_start)
            .field("formatted_length", &self.formatted_length)
            .field("change", &self.change)
            .field("no_further_changes", &self.no_further_changes)
            .field("nested", &self.nested.as_ref().map(|s| s.len()))
            .finish()
    }
}

use std::cell::Cell;
use std::ops::Range;

use xi_rope::Rope;
use xi_rope::delta::DeltaElement;

use crate::content::BlockContent;
use crate::editing::commands::{compile_command, transform_selection};
use crate::editing::reflow::{Payload, Reflow, ReflowReport};
use crate::editing::{Cmd, LineWrapper, Patch};
use crate::error::Result;
use crate::segment::Segment;
use crate::tracking::EditLog;

/// A Markdown document with an incrementally maintained layout.
///
/// The rope buffer is the single source of truth. Every command compiles to
/// a delta which is recorded in the edit log before it is applied, so the
/// next [`reflow`](Self::reflow) knows exactly which cached units it touched.
/// Between reflows any number of edits can pile up; the log collapses them
/// into one set of dirty ranges.
///
/// ```rust
/// # use reflow_engine::editing::{Cmd, Document};
/// let mut doc = Document::from_bytes(b"first\n\nsecond\n").unwrap();
/// doc.reflow().unwrap();
///
/// doc.apply(Cmd::InsertText { at: 5, text: " edit".into() });
/// let report = doc.reflow().unwrap();
/// assert_eq!(report.stats.reused, 0);
/// assert_eq!(doc.layout().len(), 2);
/// ```
pub struct Document {
    pub(crate) buffer: Rope,
    pub(crate) selection: Range<usize>,
    pub(crate) version: u64,
    /// Block structure of the current buffer.
    pub(crate) content: BlockContent,
    /// Edits since the last completed reflow.
    pub(crate) edits: EditLog,
    pub(crate) layout: Segment<Payload>,
    pub(crate) wrapper: LineWrapper,
}

impl Document {
    /// Create a new document from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        let buffer = Rope::from(text);
        let len = buffer.len();
        let content = BlockContent::parse(&buffer);
        log::debug!(
            "document loaded: {len} bytes, {} block(s)",
            content.blocks().len()
        );

        Ok(Self {
            buffer,
            selection: len..len,
            version: 0,
            content,
            // The layout starts empty, so nothing is cached yet
            edits: EditLog::new(0),
            layout: Segment::root(),
            wrapper: LineWrapper::default(),
        })
    }

    pub fn with_wrap_width(mut self, width: usize) -> Self {
        self.wrapper = LineWrapper::new(width);
        self
    }

    /// Get the document's content as raw bytes (exact round-trip)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.to_string().into_bytes()
    }

    /// Apply a command to the buffer and remember it for the next reflow.
    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        let delta = compile_command(&self.buffer, &cmd);

        let mut changed = Vec::new();
        let mut cursor = 0;
        for op in delta.els.iter() {
            match op {
                DeltaElement::Copy(_from, to) => {
                    cursor = *to;
                }
                DeltaElement::Insert(inserted) => {
                    let start = cursor;
                    let end = cursor + inserted.len();
                    changed.push(start..end);
                    cursor = end;
                }
            }
        }

        // Must see the delta in the coordinates it was built against
        self.edits.record_delta(&delta);
        self.buffer = delta.apply(&self.buffer);
        self.content = BlockContent::parse(&self.buffer);

        let new_selection = transform_selection(&self.selection, &cmd);
        self.selection = new_selection.clone();
        self.version += 1;
        log::debug!(
            "applied {cmd:?}: version {}, {} dirty range(s) pending",
            self.version,
            self.edits.ranges().len()
        );

        Patch {
            changed,
            new_selection,
            version: self.version,
        }
    }

    /// Brings the layout up to date with every edit since the last reflow.
    ///
    /// Only units touched by an edit (or by an earlier invalidation) are
    /// reformatted; everything else keeps its cached payload. A failed pass
    /// drops the whole layout, so the next reflow rebuilds it from scratch.
    pub fn reflow(&mut self) -> Result<ReflowReport> {
        self.run_reflow(None)
    }

    /// Like [`reflow`](Self::reflow), but stops after `pulls` units the way
    /// a renderer that only lays out the visible part would. Whatever the
    /// walk did not reach is rebuilt by a later reflow.
    pub fn reflow_budgeted(&mut self, pulls: usize) -> Result<ReflowReport> {
        self.run_reflow(Some(pulls))
    }

    fn run_reflow(&mut self, budget: Option<usize>) -> Result<ReflowReport> {
        let mut report = ReflowReport::default();
        let reflow = Reflow {
            edits: &self.edits,
            content: &self.content,
            buffer: &self.buffer,
            wrapper: self.wrapper,
            budget: Cell::new(budget),
        };
        let outcome = reflow
            .run(&mut self.layout, &mut report)
            .and_then(|()| self.layout.clear_change_annotations());
        self.edits.reset(self.buffer.len());

        match outcome {
            Ok(stats) => {
                report.stats = stats;
                log::debug!(
                    "reflow v{}: {} pulled, {} formatted, {:?}",
                    self.version,
                    report.pulled,
                    report.formatted,
                    report.stats
                );
                Ok(report)
            }
            Err(err) => {
                log::warn!("reflow v{} failed, dropping layout: {err}", self.version);
                self.layout.reset();
                Err(err)
            }
        }
    }

    /// Rebuilds the layout without reusing anything.
    pub fn reflow_all(&mut self) -> Result<ReflowReport> {
        self.layout.reset();
        self.reflow()
    }

    /// Discards cached layout from `position` (in the current text) onward.
    ///
    /// Returns `true` when the whole layout went. See
    /// [`Segment::invalidate_from`].
    pub fn invalidate_from(&mut self, position: usize) -> Result<bool> {
        let cached = self.edits.to_cached(position);
        self.layout.invalidate_from(cached)
    }

    /// Changes the wrap width. Every unit is formatted again on the next
    /// reflow.
    pub fn set_wrap_width(&mut self, width: usize) -> Result<()> {
        if self.wrapper.width() != width {
            self.wrapper = LineWrapper::new(width);
            self.layout.invalidate_from(0)?;
        }
        Ok(())
    }

    /// Get the current selection range
    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// Set the selection range
    pub fn set_selection(&mut self, selection: Range<usize>) {
        self.selection = selection;
    }

    /// Get the current version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get the current text content
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffer(&self) -> &Rope {
        &self.buffer
    }

    pub fn content(&self) -> &BlockContent {
        &self.content
    }

    pub fn edits(&self) -> &EditLog {
        &self.edits
    }

    pub fn layout(&self) -> &Segment<Payload> {
        &self.layout
    }

    pub fn wrap_width(&self) -> usize {
        self.wrapper.width()
    }

    /// Display lines of the cached layout.
    pub fn total_lines(&self) -> usize {
        self.layout
            .iter()
            .filter_map(|(_, unit)| unit.payload())
            .map(|block| block.lines)
            .sum()
    }
}

use std::ops::Range;

use xi_rope::{Delta, Interval, Rope, RopeInfo};

/// An edit to the document buffer. Positions are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    InsertText { at: usize, text: String },
    DeleteRange { range: Range<usize> },
    ReplaceRange { range: Range<usize>, text: String },
}

impl Cmd {
    /// The byte range this command replaces and the replacement text.
    pub fn edit(&self) -> (Range<usize>, &str) {
        match self {
            Cmd::InsertText { at, text } => (*at..*at, text.as_str()),
            Cmd::DeleteRange { range } => (range.clone(), ""),
            Cmd::ReplaceRange { range, text } => (range.clone(), text.as_str()),
        }
    }
}

/// Compiles `cmd` into a delta against `buffer`.
///
/// Out-of-range positions are clamped to the document and positions inside
/// a multi-byte character move back to its start.
pub(crate) fn compile_command(buffer: &Rope, cmd: &Cmd) -> Delta<RopeInfo> {
    let text = buffer.to_string();
    let (range, replacement) = cmd.edit();
    let start = floor_char_boundary(&text, range.start);
    let end = floor_char_boundary(&text, range.end).max(start);
    Delta::simple_edit(
        Interval::new(start, end),
        Rope::from(replacement),
        buffer.len(),
    )
}

/// Where the caret ends up after `cmd`: after inserted text, or at the start
/// of a deletion. Selections before the edit are untouched.
pub(crate) fn transform_selection(selection: &Range<usize>, cmd: &Cmd) -> Range<usize> {
    let (range, replacement) = cmd.edit();
    if selection.end < range.start {
        return selection.clone();
    }
    let caret = range.start + replacement.len();
    caret..caret
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

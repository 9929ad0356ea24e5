//! Syntax knowledge for the block markers the parser understands.

/// Blockquote prefixes (`>`).
pub struct BlockQuote;

impl BlockQuote {
    pub const PREFIX: u8 = b'>';

    /// Counts the `>` prefixes of a line and returns `(depth, offset)` where
    /// `offset` is the byte index at which the content starts.
    ///
    /// Accepts `> text`, `>> nested` and `> > spaced nested`.
    pub fn strip_prefixes(line: &str) -> (usize, usize) {
        let bytes = line.as_bytes();
        let mut i = 0;
        let mut depth = 0;
        loop {
            while bytes.get(i) == Some(&b' ') {
                i += 1;
            }
            if bytes.get(i) != Some(&Self::PREFIX) {
                break;
            }
            depth += 1;
            i += 1;
            if bytes.get(i) == Some(&b' ') {
                i += 1;
            }
        }
        (depth, i)
    }
}

/// Which delimiter a fenced code block uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    Backticks,
    Tildes,
}

/// Fenced code block delimiters.
pub struct CodeFence;

impl CodeFence {
    pub const BACKTICKS: &'static str = "```";
    pub const TILDES: &'static str = "~~~";

    /// The fence a line opens or closes, if it looks like one.
    pub fn detect(remainder: &str) -> Option<FenceKind> {
        let text = remainder.trim_start_matches(' ');
        if text.starts_with(Self::BACKTICKS) {
            Some(FenceKind::Backticks)
        } else if text.starts_with(Self::TILDES) {
            Some(FenceKind::Tildes)
        } else {
            None
        }
    }

    /// A fence is only closed by the same delimiter that opened it.
    pub fn closes(open: FenceKind, line: Option<FenceKind>) -> bool {
        line == Some(open)
    }
}

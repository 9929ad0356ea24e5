use serde::Serialize;

use crate::parsing::markers::BlockQuote;
use crate::units::UnitKind;

/// What the reference formatter caches for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormattedBlock {
    /// Display lines at the wrap width, trailing blank lines included.
    pub lines: usize,
}

/// Greedy word wrapper counting display lines at a fixed width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineWrapper {
    width: usize,
}

impl LineWrapper {
    /// A width of zero disables wrapping.
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Formats the text of one leaf unit.
    pub fn format(&self, text: &str, kind: UnitKind) -> FormattedBlock {
        let mut lines = 0;
        let mut words: Vec<&str> = Vec::new();
        for line in text.lines() {
            let (_, offset) = BlockQuote::strip_prefixes(line);
            let body = &line[offset..];
            match kind {
                UnitKind::Atomic => lines += self.rows(body.chars().count()),
                _ if body.trim().is_empty() => {
                    lines += self.wrap(&words) + 1;
                    words.clear();
                }
                _ => words.extend(body.split_whitespace()),
            }
        }
        lines += self.wrap(&words);
        FormattedBlock { lines }
    }

    /// Lines taken by a run of words; an empty run takes none.
    fn wrap(&self, words: &[&str]) -> usize {
        let width = self.effective_width();
        let mut lines = 0;
        let mut used = 0;
        for word in words {
            let len = word.chars().count();
            if used > 0 && used + 1 + len <= width {
                used += 1 + len;
                continue;
            }
            // Over-long words break at the width
            lines += self.rows(len);
            used = match len % width {
                0 => width,
                rest => rest,
            };
        }
        lines
    }

    fn rows(&self, chars: usize) -> usize {
        chars.div_ceil(self.effective_width()).max(1)
    }

    fn effective_width(&self) -> usize {
        match self.width {
            0 => usize::MAX,
            width => width,
        }
    }
}

impl Default for LineWrapper {
    fn default() -> Self {
        Self::new(80)
    }
}

use super::classify::LineClass;
use super::markers::{CodeFence, FenceKind};
use super::text::Span;
use super::{Block, BlockKind};

/// The leaf block currently being accumulated.
#[derive(Debug, Clone, Copy)]
enum Open {
    None,
    Paragraph {
        start: usize,
        end: usize,
        quote_depth: usize,
    },
    Fence {
        kind: FenceKind,
        start: usize,
        end: usize,
        quote_depth: usize,
    },
}

/// Line-at-a-time state machine turning classified lines into blocks.
///
/// Blank lines end paragraphs but are not part of any block here; the
/// caller decides who owns them.
pub struct BlockBuilder {
    open: Open,
    out: Vec<Block>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self {
            open: Open::None,
            out: Vec::new(),
        }
    }

    pub fn push(&mut self, line: &LineClass) {
        if let Open::Fence {
            kind,
            start,
            quote_depth,
            ..
        } = self.open
        {
            self.open = Open::Fence {
                kind,
                start,
                end: line.line.end,
                quote_depth,
            };
            if CodeFence::closes(kind, line.fence) {
                self.close();
            }
            return;
        }

        if line.is_blank {
            self.close();
            return;
        }

        if let Some(kind) = line.fence {
            self.close();
            self.open = Open::Fence {
                kind,
                start: line.line.start,
                end: line.line.end,
                quote_depth: line.quote_depth,
            };
            return;
        }

        match self.open {
            Open::Paragraph {
                start, quote_depth, ..
            } if quote_depth == line.quote_depth => {
                self.open = Open::Paragraph {
                    start,
                    end: line.line.end,
                    quote_depth,
                };
            }
            _ => {
                // A change of quote depth starts a new paragraph
                self.close();
                self.open = Open::Paragraph {
                    start: line.line.start,
                    end: line.line.end,
                    quote_depth: line.quote_depth,
                };
            }
        }
    }

    /// Flushes whatever is still open. An unterminated fence runs to the
    /// end of the document.
    pub fn finish(mut self) -> Vec<Block> {
        self.close();
        self.out
    }

    fn close(&mut self) {
        let block = match std::mem::replace(&mut self.open, Open::None) {
            Open::None => return,
            Open::Paragraph {
                start,
                end,
                quote_depth,
            } => Block {
                kind: BlockKind::Paragraph,
                quote_depth,
                span: Span::new(start, end),
            },
            Open::Fence {
                kind,
                start,
                end,
                quote_depth,
            } => Block {
                kind: BlockKind::FencedCode(kind),
                quote_depth,
                span: Span::new(start, end),
            },
        };
        self.out.push(block);
    }
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

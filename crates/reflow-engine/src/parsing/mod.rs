//! # Block Parsing
//!
//! Two-phase block parsing over an `xi_rope::Rope`.
//!
//! 1. **Line classification** (`classify`): each line is reduced to local
//!    facts (quote depth, blank status, fence delimiter)
//! 2. **Block construction** (`builder`): a `BlockBuilder` folds the
//!    classified lines into paragraphs and fenced code blocks
//!
//! [`parse_blocks`] then widens the blocks so they tile the document:
//! blank lines belong to the block before them and the first block starts
//! at zero. Fenced code is a raw zone; nothing inside it is interpreted.

pub mod builder;
pub mod classify;
pub mod markers;
pub mod text;

use xi_rope::Rope;

pub use builder::BlockBuilder;
pub use markers::FenceKind;
pub use text::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    FencedCode(FenceKind),
}

/// A leaf block and the number of quote levels around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub quote_depth: usize,
    pub span: Span,
}

/// Parses `rope` into blocks whose spans cover it without gaps.
pub fn parse_blocks(rope: &Rope) -> Vec<Block> {
    let mut builder = BlockBuilder::new();
    for line in text::lines_with_spans(rope) {
        builder.push(&classify::classify(&line));
    }
    let mut blocks = builder.finish();

    let len = rope.len();
    if blocks.is_empty() {
        if len > 0 {
            blocks.push(Block {
                kind: BlockKind::Paragraph,
                quote_depth: 0,
                span: Span::new(0, len),
            });
        }
        return blocks;
    }
    blocks[0].span.start = 0;
    for i in 1..blocks.len() {
        blocks[i - 1].span.end = blocks[i].span.start;
    }
    if let Some(last) = blocks.last_mut() {
        last.span.end = len;
    }
    blocks
}

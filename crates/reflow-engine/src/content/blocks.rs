use std::cmp::Ordering;

use xi_rope::Rope;

use crate::parsing::{Block, BlockKind, parse_blocks};
use crate::units::{UnitKind, UnitSpec};

use super::ContentSource;

/// Markdown blocks as a content tree.
///
/// At depth `d`, a block quoted exactly `d` levels deep is a leaf unit
/// (paragraphs are `Paragraph`, fenced code is `Atomic`), and a run of
/// blocks quoted more deeply is one `Container` whose nested segment sits at
/// depth `d + 1`.
#[derive(Debug, Clone, Default)]
pub struct BlockContent {
    blocks: Vec<Block>,
    len: usize,
}

impl BlockContent {
    pub fn parse(rope: &Rope) -> Self {
        Self {
            blocks: parse_blocks(rope),
            len: rope.len(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn index_at(&self, position: usize) -> Option<usize> {
        let index = self.blocks.partition_point(|b| b.span.end <= position);
        (index < self.blocks.len()).then_some(index)
    }
}

impl ContentSource for BlockContent {
    fn unit_at(&self, position: usize, depth: usize) -> Option<UnitSpec> {
        let index = self.index_at(position)?;
        let block = self.blocks[index];
        match block.quote_depth.cmp(&depth) {
            Ordering::Less => None,
            Ordering::Equal => {
                let kind = match block.kind {
                    BlockKind::Paragraph => UnitKind::Paragraph,
                    BlockKind::FencedCode(_) => UnitKind::Atomic,
                };
                Some(UnitSpec::new(kind, block.span.end - position))
            }
            Ordering::Greater => {
                let end = self.blocks[index..]
                    .iter()
                    .take_while(|b| b.quote_depth > depth)
                    .last()
                    .map(|b| b.span.end)?;
                Some(UnitSpec::new(UnitKind::Container, end - position))
            }
        }
    }
}

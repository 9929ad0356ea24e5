//! # Content Tree
//!
//! The content a segment fabricates its layout units from.
//!
//! - **`fixed`**: `FixedUnits`, an explicit list of unit kinds and lengths
//! - **`blocks`**: `BlockContent`, markdown blocks parsed from an `xi_rope::Rope`

pub mod blocks;
pub mod fixed;

pub use blocks::BlockContent;
pub use fixed::FixedUnits;

use crate::units::UnitSpec;

/// Produces the structural unit that covers a content position.
pub trait ContentSource {
    /// The kind of the unit covering `position` at nesting `depth`, with the
    /// length from `position` to the end of that unit.
    ///
    /// `None` means the segment at `depth` has no content at `position`;
    /// fabrication treats it as the end of the segment.
    fn unit_at(&self, position: usize, depth: usize) -> Option<UnitSpec>;
}

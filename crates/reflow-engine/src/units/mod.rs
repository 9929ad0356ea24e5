//! # Layout Units
//!
//! The cached, ordered list of formatted layout units owned by a segment.
//!
//! - **`unit`**: `LayoutUnit`, its `UnitKind`/`ChangeKind` classifications and
//!   the generational `UnitId` handle
//! - **`list`**: `NodeList`, the arena-backed doubly linked list with
//!   O(island) range disposal
//!
//! ## Key Invariants
//!
//! - Units tile their segment: `next.content_start == prev.content_start + prev.formatted_length`
//! - Disposing a run rewrites only the links of its two neighbours
//! - A disposed unit's handle never resolves again

pub mod list;
pub mod unit;

pub use list::{Iter, NodeList};
pub use unit::{ChangeKind, LayoutUnit, UnitId, UnitKind, UnitSpec};

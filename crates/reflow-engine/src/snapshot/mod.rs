//! # Layout Snapshots
//!
//! Support for testing layouts through snapshot assertions and invariant
//! checks.
//!
//! ## Modules
//!
//! - **`normalize`**: Converts a segment tree into a stable, serializable
//!   `SegmentSnap` for `insta` snapshot testing
//! - **`invariants`**: Checks a settled layout is consistent (contiguous
//!   units, nested segments that exactly fill their containers, no leftover
//!   change annotations)

pub mod invariants;
pub mod normalize;

pub use invariants::check as invariants;
pub use normalize::{SegmentSnap, UnitSnap, normalize};

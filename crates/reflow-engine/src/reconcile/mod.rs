//! # Reconciliation
//!
//! Turns the edits made since the last pass into a minimal description of
//! which cached layout units changed.
//!
//! ## Pipeline
//!
//! 1. **`dirty`**: `DirtyRange` records from the edit tracker, validated to
//!    be ordered and non-overlapping
//! 2. **`compile`**: each range becomes one `ChangeDescriptor` against the
//!    node list (first affected unit, kind, sync point)
//! 3. **`merge`**: touching or overlapping descriptors coalesce into
//!    disjoint change islands
//! 4. **`cursor`**: the islands seed a `ReconciliationCursor`, which the
//!    segment's pull protocol consumes one unit at a time

pub mod compile;
pub mod cursor;
pub mod dirty;
pub mod merge;

pub use compile::{ChangeDescriptor, compile};
pub use cursor::{FirstChange, PassStats, ReconciliationCursor};
pub use dirty::{DirtyRange, DirtyRangeTracker, validate};
pub use merge::{is_disjoint, merge};

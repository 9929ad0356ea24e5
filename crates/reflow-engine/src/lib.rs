pub mod content;
pub mod editing;
pub mod error;
pub mod parsing;
pub mod reconcile;
pub mod segment;
pub mod snapshot;
pub mod tracking;
pub mod units;

// Re-export key types for easier usage
pub use content::{BlockContent, ContentSource, FixedUnits};
pub use editing::{Cmd, Document, FormattedBlock, LineWrapper, Patch, ReflowReport};
pub use error::{ReconcileError, Result};
pub use reconcile::{ChangeDescriptor, DirtyRange, DirtyRangeTracker, FirstChange, PassStats};
pub use segment::{Segment, StructuralMark};
pub use tracking::EditLog;
pub use units::{ChangeKind, LayoutUnit, NodeList, UnitId, UnitKind, UnitSpec};

use crate::units::UnitId;

/// Failures surfaced by the reconciliation engine.
///
/// Invariant violations abort the pass that detected them; callers are
/// expected to fall back to structural invalidation rather than continue
/// with an inconsistent cache.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(
        "dirty range starting at {start} overlaps or precedes the previous range ending at {previous_end}"
    )]
    UnorderedDirtyRanges { start: usize, previous_end: usize },

    #[error("unit {0:?} is not part of this segment")]
    StaleUnit(UnitId),

    #[error("node list is discontinuous at {unit:?}: expected start {expected}, found {found}")]
    Discontinuity {
        unit: UnitId,
        expected: usize,
        found: usize,
    },

    #[error("change descriptor anchored at {0:?} does not lie on the node list")]
    DetachedDescriptor(UnitId),

    #[error("disposal starting at {first:?} never reached sync point {until:?}")]
    BrokenChain { first: UnitId, until: UnitId },

    #[error("cached position {position} shifted by {shift} falls before the segment start")]
    NegativePosition { position: usize, shift: isize },

    /// `None` stands for the start of the segment.
    #[error("pull out of order: expected to continue from {expected:?}, got {got:?}")]
    OutOfOrder {
        expected: Option<UnitId>,
        got: Option<UnitId>,
    },

    #[error("a formatting pass is already in progress on this segment")]
    PassInProgress,

    #[error("no formatting pass is in progress on this segment")]
    NoPassInProgress,
}

impl ReconcileError {
    /// Contract failures that leave the node list untrustworthy. A pass that
    /// hits one is aborted and the segment is invalidated wholesale.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            ReconcileError::Discontinuity { .. }
                | ReconcileError::DetachedDescriptor(_)
                | ReconcileError::BrokenChain { .. }
                | ReconcileError::NegativePosition { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

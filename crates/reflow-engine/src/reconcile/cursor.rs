use std::collections::VecDeque;

use serde::Serialize;

use crate::error::{ReconcileError, Result};
use crate::units::UnitId;

use super::compile::ChangeDescriptor;

/// Answer to "where does the first change of this pass begin?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstChange {
    /// Nothing changed; every cached unit is valid.
    Unchanged,
    /// The very first unit of the segment is the first changed one.
    AtStart,
    /// Every unit up to and including this one is unchanged.
    After(UnitId),
}

/// Counters for one formatting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    /// Units handed back with their cache intact.
    pub reused: usize,
    /// Units kept but flagged for reformatting.
    pub modified: usize,
    /// Units created from the content tree.
    pub fabricated: usize,
    /// Units destroyed.
    pub disposed: usize,
    /// Change islands applied.
    pub islands: usize,
}

impl std::ops::AddAssign for PassStats {
    fn add_assign(&mut self, other: Self) {
        self.reused += other.reused;
        self.modified += other.modified;
        self.fabricated += other.fabricated;
        self.disposed += other.disposed;
        self.islands += other.islands;
    }
}

/// An island whose descriptor has been applied but whose sync point the
/// walk has not reached yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ActiveIsland {
    pub(crate) sync: Option<UnitId>,
    /// New-coordinate position (relative) at which `sync` resumes.
    pub(crate) resume_at: usize,
    /// Whether the consumer has been handed anything for this island yet.
    pub(crate) delivered: bool,
}

/// Transient state of one pull sequence over a segment.
#[derive(Debug, Default)]
pub struct ReconciliationCursor {
    pub(crate) pending: VecDeque<ChangeDescriptor>,
    pub(crate) active: Option<ActiveIsland>,
    pub(crate) last_returned: Option<UnitId>,
    /// Changed units handed out whose format has not been recorded yet.
    pub(crate) unformatted: Vec<UnitId>,
    pub(crate) first_change: Option<FirstChange>,
    /// Net length change of every island applied so far.
    pub(crate) shift: isize,
    pub(crate) stats: PassStats,
}

impl ReconciliationCursor {
    pub(crate) fn new(pending: VecDeque<ChangeDescriptor>, first_change: FirstChange) -> Self {
        Self {
            pending,
            active: None,
            last_returned: None,
            unformatted: Vec::new(),
            first_change: Some(first_change),
            shift: 0,
            stats: PassStats::default(),
        }
    }

    /// No descriptor is pending or half applied: nothing after the current
    /// position changed.
    pub fn exhausted(&self) -> bool {
        self.pending.is_empty() && self.active.is_none()
    }

    pub fn pending(&self) -> impl Iterator<Item = &ChangeDescriptor> {
        self.pending.iter()
    }

    pub fn last_returned(&self) -> Option<UnitId> {
        self.last_returned
    }

    pub fn stats(&self) -> PassStats {
        self.stats
    }

    /// Where the skipped, unchanged prefix ends: the unit a consumer may
    /// resume from without pulling anything before it.
    pub(crate) fn resume_anchor(&self) -> Option<UnitId> {
        match self.first_change {
            Some(FirstChange::After(anchor)) => Some(anchor),
            _ => None,
        }
    }
}

/// New-coordinate position of a cached position once `shift` has been applied.
pub(crate) fn shifted(position: usize, shift: isize) -> Result<usize> {
    position
        .checked_add_signed(shift)
        .ok_or(ReconcileError::NegativePosition { position, shift })
}

use crate::units::{UnitKind, UnitSpec};

use super::ContentSource;

/// A flat content tree made of explicit `(kind, length)` units.
///
/// Only the top level has content; nested segments of container units are
/// always empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedUnits {
    units: Vec<UnitSpec>,
}

impl FixedUnits {
    pub fn new(units: impl IntoIterator<Item = (UnitKind, usize)>) -> Self {
        Self {
            units: units
                .into_iter()
                .filter(|&(_, len)| len > 0)
                .map(|(kind, len)| UnitSpec::new(kind, len))
                .collect(),
        }
    }

    /// Units of one kind with the given lengths.
    pub fn uniform(kind: UnitKind, lengths: &[usize]) -> Self {
        Self::new(lengths.iter().map(|&len| (kind, len)))
    }

    pub fn total_length(&self) -> usize {
        self.units.iter().map(|u| u.length).sum()
    }
}

impl ContentSource for FixedUnits {
    fn unit_at(&self, position: usize, depth: usize) -> Option<UnitSpec> {
        if depth > 0 {
            return None;
        }
        let mut start = 0;
        for unit in &self.units {
            let end = start + unit.length;
            if position < end {
                return Some(UnitSpec::new(unit.kind, end - position));
            }
            start = end;
        }
        None
    }
}

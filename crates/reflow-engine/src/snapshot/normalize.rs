use serde::Serialize;

use crate::editing::Payload;
use crate::segment::Segment;

#[derive(Debug, Serialize)]
pub struct SegmentSnap {
    pub depth: usize,
    pub origin: usize,
    pub units: Vec<UnitSnap>,
}

#[derive(Debug, Serialize)]
pub struct UnitSnap {
    pub kind: String,
    /// Absolute content span.
    pub span: (usize, usize),
    pub lines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<SegmentSnap>,
}

/// Snapshot of a settled layout, nested segments included.
pub fn normalize(segment: &Segment<Payload>) -> SegmentSnap {
    let origin = segment.origin();
    let units = segment
        .iter()
        .map(|(_, unit)| {
            let start = origin + unit.content_start();
            UnitSnap {
                kind: format!("{:?}", unit.kind()),
                span: (start, start + unit.formatted_length()),
                lines: unit.payload().map_or(0, |block| block.lines),
                nested: unit.nested().map(normalize),
            }
        })
        .collect();

    SegmentSnap {
        depth: segment.depth(),
        origin,
        units,
    }
}

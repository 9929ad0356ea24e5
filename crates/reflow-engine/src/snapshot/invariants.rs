use crate::editing::Payload;
use crate::segment::Segment;
use crate::units::ChangeKind;

/// Panics unless `segment` is a settled layout covering `len` bytes.
pub fn check(segment: &Segment<Payload>, len: usize) {
    assert!(
        !segment.in_pass(),
        "segment at depth {} is still in a pass",
        segment.depth()
    );
    assert_eq!(
        segment.total_length(),
        len,
        "segment at depth {} (origin {}) does not cover its content",
        segment.depth(),
        segment.origin()
    );
    if let Err(err) = segment.list().check_contiguous() {
        panic!("segment at depth {} is not contiguous: {err}", segment.depth());
    }

    for (id, unit) in segment.iter() {
        assert_eq!(
            unit.change(),
            ChangeKind::Unchanged,
            "unit {id:?} kept its change annotation"
        );
        assert!(unit.formatted_length() > 0, "unit {id:?} is empty");
        assert!(unit.payload().is_some(), "unit {id:?} was never formatted");
        assert_eq!(
            unit.kind().is_container(),
            unit.nested().is_some(),
            "unit {id:?} is a {:?} but nested segment presence disagrees",
            unit.kind()
        );
        if let Some(nested) = unit.nested() {
            assert_eq!(
                nested.origin(),
                segment.origin() + unit.content_start(),
                "nested segment of {id:?} is not positioned at its container"
            );
            assert_eq!(nested.depth(), segment.depth() + 1);
            check(nested, unit.formatted_length());
        }
    }
}

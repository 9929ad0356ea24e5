use xi_rope::Rope;

/// A byte range `[start, end)` into the rope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// One physical line of the rope, newline included.
#[derive(Debug, Clone)]
pub struct LineRef {
    pub span: Span,
    pub text: String,
}

/// Lines with their byte spans. `lines_raw` keeps the newlines so the spans
/// tile the rope exactly.
pub fn lines_with_spans(rope: &Rope) -> impl Iterator<Item = LineRef> + '_ {
    let mut offset = 0;
    rope.lines_raw(..).map(move |line| {
        let start = offset;
        offset += line.len();
        LineRef {
            span: Span::new(start, offset),
            text: line.into_owned(),
        }
    })
}

pub fn slice_to_string(rope: &Rope, span: Span) -> String {
    rope.slice_to_cow(span.start..span.end).into_owned()
}

/// The text of `span` cut to at most `max` bytes (on a char boundary), with
/// `...` appended when cut.
pub fn preview(rope: &Rope, span: Span, max: usize) -> String {
    let mut text = slice_to_string(rope, span).replace('\n', "⏎");
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

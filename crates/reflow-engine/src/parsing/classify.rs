use super::markers::{BlockQuote, CodeFence, FenceKind};
use super::text::{LineRef, Span};

/// Local facts about one line, gathered without looking at its neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineClass {
    /// Full span of the line, newline included.
    pub line: Span,
    /// Nothing but whitespace after the quote prefixes.
    pub is_blank: bool,
    pub quote_depth: usize,
    /// Fence delimiter at the start of the content, if any.
    pub fence: Option<FenceKind>,
}

pub fn classify(line: &LineRef) -> LineClass {
    let trimmed = line.text.trim_end_matches(['\r', '\n']);
    let (quote_depth, offset) = BlockQuote::strip_prefixes(trimmed);
    let remainder = &trimmed[offset..];
    LineClass {
        line: line.span,
        is_blank: remainder.trim().is_empty(),
        quote_depth,
        fence: CodeFence::detect(remainder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> LineRef {
        LineRef {
            span: Span::new(0, text.len()),
            text: text.to_string(),
        }
    }

    #[test]
    fn quoted_blank_line_is_blank() {
        let class = classify(&line(">  \n"));
        assert!(class.is_blank);
        assert_eq!(class.quote_depth, 1);
    }

    #[test]
    fn fence_inside_quote_is_detected() {
        let class = classify(&line("> > ~~~\n"));
        assert_eq!(class.quote_depth, 2);
        assert_eq!(class.fence, Some(FenceKind::Tildes));
        assert!(!class.is_blank);
    }

    #[test]
    fn plain_text_has_no_markers() {
        let class = classify(&line("just text"));
        assert_eq!(class.quote_depth, 0);
        assert_eq!(class.fence, None);
        assert_eq!(class.line, Span::new(0, 9));
    }
}

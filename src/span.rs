//! Byte spans over template text and the edit lists rewrite passes produce
use std::ops::Range;

/// Represents a span in the template text (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Convert to a Range for slicing
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The text this span covers
    pub fn slice<'t>(&self, text: &'t str) -> &'t str {
        &text[self.range()]
    }
}

/// Replace the text under `span` with `replacement`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

impl Edit {
    pub fn new(span: Span, replacement: impl Into<String>) -> Self {
        Edit {
            span,
            replacement: replacement.into(),
        }
    }
}

/// Apply a list of edits in one left-to-right rewrite.
///
/// Edits must be sorted by start offset and must not overlap; an edit that
/// starts inside the previous one is skipped.
pub fn apply_edits(text: &str, edits: &[Edit]) -> String {
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.span.start < cursor {
            continue;
        }
        output.push_str(&text[cursor..edit.span.start]);
        output.push_str(&edit.replacement);
        cursor = edit.span.end;
    }
    output.push_str(&text[cursor..]);
    output
}

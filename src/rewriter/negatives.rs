//! Negative-tag extraction: `**text**` moves `text` to the negative prompt

use crate::span::{apply_edits, Edit, Span};

use super::cleanup::collapse_commas;

/// Ordered, de-duplicated set of negative tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegativeTags {
    tags: Vec<String>,
}

impl NegativeTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag; blank and repeated tags are ignored
    pub fn add(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return;
        }
        self.tags.push(tag.to_string());
    }

    pub fn extend<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.add(tag.as_ref());
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Join behind a caller-supplied base negative prompt
    pub fn to_prompt(&self, base: &str) -> String {
        let generated = self.tags.join(", ");
        let base = base.trim();
        let joined = match (base.is_empty(), generated.is_empty()) {
            (_, true) => base.to_string(),
            (true, false) => generated,
            (false, false) => format!("{}, {}", base, generated),
        };
        collapse_commas(&joined).trim().to_string()
    }
}

/// Spans of every `**...**` block on a single line
fn find_negative_blocks(text: &str) -> Vec<Span> {
    let mut blocks = Vec::new();
    let mut from = 0;
    while let Some(open) = text[from..].find("**") {
        let start = from + open;
        let rest = &text[start + 2..];
        match rest.find("**") {
            Some(close) if !rest[..close].contains('\n') => {
                let end = start + 2 + close + 2;
                blocks.push(Span::new(start, end));
                from = end;
            }
            _ => from = start + 1,
        }
    }
    blocks
}

/// Remove every `**...**` block, returning the text and the block contents
pub fn strip_negative_tags(text: &str) -> (String, Vec<String>) {
    let blocks = find_negative_blocks(text);
    let found = blocks
        .iter()
        .map(|span| text[span.start + 2..span.end - 2].to_string())
        .collect();
    let edits: Vec<Edit> = blocks.into_iter().map(|span| Edit::new(span, "")).collect();
    (apply_edits(text, &edits), found)
}

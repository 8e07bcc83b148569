//! Reference pass: `__name__`, `<name>`, `<scope:[a][b]>` and `<[a][b]>`
//!
//! Each reference is handed to the selector. A `__`-opened reference whose
//! name has nothing behind it expands to nothing; an `<`-opened one is left
//! verbatim so host syntax such as `<lora:name:0.8>` passes through.

use rand::Rng;

use crate::library::ALL_ENTRIES;
use crate::selector::Selector;
use crate::span::{apply_edits, Edit, Span};

use super::comments::strip_comment;
use super::functions::function_pass;

/// Sweeps of the reference rewrite per pass before inline functions run
pub const MAX_REFERENCE_SWEEPS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opener {
    /// `__`
    Underscore,
    /// `<`
    Angle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMatch {
    pub span: Span,
    pub opener: Opener,
    /// Text between the delimiters
    pub body: String,
}

/// Find references left to right. The opener is `__` or `<`, the closer is
/// the nearest following `__` or `>` on the same line.
pub fn find_references(text: &str) -> Vec<ReferenceMatch> {
    let bytes = text.as_bytes();
    let mut matches = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let opener = if bytes[i..].starts_with(b"__") {
            Some((Opener::Underscore, 2))
        } else if bytes[i] == b'<' {
            Some((Opener::Angle, 1))
        } else {
            None
        };
        if let Some((opener, len)) = opener {
            if let Some((close, close_len)) = find_closer(bytes, i + len) {
                matches.push(ReferenceMatch {
                    span: Span::new(i, close + close_len),
                    opener,
                    body: text[i + len..close].to_string(),
                });
                i = close + close_len;
                continue;
            }
        }
        i += 1;
    }
    matches
}

fn find_closer(bytes: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'\n' => return None,
            b'>' => return Some((j, 1)),
            b'_' if bytes.get(j + 1) == Some(&b'_') => return Some((j, 2)),
            _ => j += 1,
        }
    }
    None
}

/// Contents of every `[...]` group, in order
pub fn parse_options(text: &str) -> Vec<String> {
    let mut options = Vec::new();
    let mut from = 0;
    while let Some(open) = text[from..].find('[') {
        let start = from + open + 1;
        match text[start..].find(']') {
            Some(close) => {
                options.push(text[start..start + close].to_string());
                from = start + close;
            }
            None => break,
        }
    }
    options
}

/// Resolve one reference body through the selector
fn expand_reference<R: Rng>(body: &str, selector: &mut Selector<'_, R>) -> Option<String> {
    if body.is_empty() {
        return Some(String::new());
    }
    if let Some((scope, opts)) = body.split_once(':') {
        let groups = parse_options(opts);
        if groups.is_empty() {
            selector.select(scope, None)
        } else {
            selector.select(scope, Some(groups.as_slice()))
        }
    } else {
        let groups = parse_options(body);
        if groups.is_empty() {
            selector.select(body, None)
        } else {
            selector.select(ALL_ENTRIES, Some(groups.as_slice()))
        }
    }
}

/// Expand every reference once
pub fn reference_sweep<R: Rng>(text: &str, selector: &mut Selector<'_, R>) -> String {
    let matches = find_references(text);
    if matches.is_empty() {
        return text.to_string();
    }
    let mut edits = Vec::with_capacity(matches.len());
    for m in matches {
        let replacement = match expand_reference(&m.body, selector) {
            Some(value) => strip_comment(&value),
            None => match m.opener {
                Opener::Underscore => String::new(),
                Opener::Angle => m.span.slice(text).to_string(),
            },
        };
        edits.push(Edit::new(m.span, replacement));
    }
    apply_edits(text, &edits)
}

/// Sweep references until the text settles (bounded), then run inline
/// functions over the result
pub fn reference_pass<R: Rng>(text: &str, selector: &mut Selector<'_, R>) -> String {
    let mut previous = text.to_string();
    let mut current = reference_sweep(text, selector);
    let mut sweeps = 1;
    while current != previous && sweeps < MAX_REFERENCE_SWEEPS {
        previous = current;
        current = reference_sweep(&previous, selector);
        sweeps += 1;
    }
    function_pass(&current, selector.rng_mut())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_underscore_and_angle_references() {
        let found = find_references("a __colors__ b <chars:[female]> c");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].body, "colors");
        assert_eq!(found[0].opener, Opener::Underscore);
        assert_eq!(found[1].body, "chars:[female]");
        assert_eq!(found[1].opener, Opener::Angle);
    }

    #[test]
    fn test_reference_stops_at_newline() {
        assert!(find_references("__open\nclose__").is_empty());
    }

    #[test]
    fn test_lazy_closer() {
        let found = find_references("___x__");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].body, "_x");
    }

    #[test]
    fn test_parse_options() {
        assert_eq!(parse_options("[female][--male][a|b]"), vec!["female", "--male", "a|b"]);
        assert!(parse_options("no options").is_empty());
    }
}

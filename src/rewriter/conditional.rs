//! Conditional pass: `[if trigger: true text | false text]`
//!
//! Blocks resolve innermost-first: a block whose body still holds another
//! `[if` is skipped until the inner one has been replaced. Each block tests
//! its trigger, case-insensitively, against the text with the block removed.

use crate::span::Span;

use super::find_ignore_ascii_case;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Conditional {
    span: Span,
    trigger: String,
    if_true: String,
    if_false: String,
}

/// Parse a block opening at `start`, or `None` if it is not a resolvable
/// innermost conditional
fn parse_at(text: &str, start: usize) -> Option<Conditional> {
    let after = start + "[if".len();
    let rest = &text[after..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let colon = rest.find([':', '|', ']'])?;
    if rest.as_bytes()[colon] != b':' {
        return None;
    }
    let trigger = rest[..colon].trim();
    if trigger.is_empty() {
        return None;
    }

    let body_start = after + colon + 1;
    let body_rel_end = text[body_start..].find(']')?;
    let body_end = body_start + body_rel_end;
    if find_ignore_ascii_case(&text[..body_end], "[if", body_start).is_some() {
        return None;
    }

    let body = text[body_start..body_end].trim_start();
    let (if_true, if_false) = match body.split_once('|') {
        Some((t, f)) => (t.trim_end(), f.trim_start()),
        None => (body, ""),
    };
    Some(Conditional {
        span: Span::new(start, body_end + 1),
        trigger: trigger.to_string(),
        if_true: if_true.to_string(),
        if_false: if_false.to_string(),
    })
}

/// Leftmost resolvable conditional
fn find_conditional(text: &str) -> Option<Conditional> {
    let mut from = 0;
    while let Some(start) = find_ignore_ascii_case(text, "[if", from) {
        if let Some(found) = parse_at(text, start) {
            return Some(found);
        }
        from = start + 1;
    }
    None
}

/// Resolve conditionals one at a time until none remain
pub fn conditional_pass(text: &str) -> String {
    let mut text = text.to_string();
    while let Some(block) = find_conditional(&text) {
        let full = block.span.slice(&text);
        let rest = text.replace(full, "").to_lowercase();
        let replacement = if rest.contains(&block.trigger.to_lowercase()) {
            &block.if_true
        } else {
            &block.if_false
        };
        text = format!(
            "{}{}{}",
            &text[..block.span.start],
            replacement,
            &text[block.span.end..]
        );
    }
    text
}

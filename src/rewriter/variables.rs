//! Variable passes: `$name=value` assignments and `$name.method` uses

use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

use crate::grammar::VariableMethod;
use crate::selector::Selector;
use crate::span::{apply_edits, Edit, Span};

use super::choice::choice_pass;
use super::reference::reference_pass;

/// Rounds of reference and choice expansion applied to an assigned value
pub const MAX_ASSIGN_DEPTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Assignment {
    span: Span,
    name: String,
    value: String,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// End of the variable name starting at `from`
fn name_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    i
}

fn skip_whitespace(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// A `$` that starts a variable: not part of a `$$` pair
fn is_sigil(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'$'
        && (i == 0 || bytes[i - 1] != b'$')
        && bytes.get(i + 1).is_some_and(|&b| b != b'$')
}

/// End of a brace-balanced `{...}` block starting at `from`
fn balanced_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, &b) in bytes[from..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn find_assignments(text: &str) -> Vec<Assignment> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !is_sigil(bytes, i) {
            i += 1;
            continue;
        }
        let end = name_end(bytes, i + 1);
        if end == i + 1 {
            i += 1;
            continue;
        }
        let eq = skip_whitespace(bytes, end);
        if bytes.get(eq) != Some(&b'=') {
            i = end;
            continue;
        }
        let start = skip_whitespace(bytes, eq + 1);
        let value_end = if bytes.get(start) == Some(&b'{') {
            balanced_end(bytes, start)
        } else {
            None
        };
        let value_end = value_end.unwrap_or_else(|| {
            let mut j = start;
            while j < bytes.len() && !bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            j
        });
        if value_end == start {
            i = end;
            continue;
        }
        found.push(Assignment {
            span: Span::new(i, value_end),
            name: text[i + 1..end].to_string(),
            value: text[start..value_end].to_string(),
        });
        i = value_end;
    }
    found
}

/// Resolve and store every assignment, removing it from the text
pub fn assign_pass<R: Rng>(text: &str, selector: &mut Selector<'_, R>) -> String {
    let assignments = find_assignments(text);
    if assignments.is_empty() {
        return text.to_string();
    }
    let mut edits = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let mut value = assignment.value;
        for _ in 0..MAX_ASSIGN_DEPTH {
            let seed = selector.seed();
            let next = reference_pass(&value, selector);
            let next = choice_pass(&next, selector.rng_mut(), seed);
            if next == value {
                break;
            }
            value = next;
        }
        debug!("Variable ${} = '{}'", assignment.name, value);
        selector.state.variables.insert(assignment.name, value);
        edits.push(Edit::new(assignment.span, ""));
    }
    apply_edits(text, &edits)
}

/// Substitute every known `$name`, applying any recognized method chain.
/// Unknown names stay verbatim.
pub fn use_pass(text: &str, variables: &HashMap<String, String>) -> String {
    let bytes = text.as_bytes();
    let mut edits = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !is_sigil(bytes, i) {
            i += 1;
            continue;
        }
        let end = name_end(bytes, i + 1);
        let Some(value) = variables.get(&text[i + 1..end]) else {
            i = end.max(i + 1);
            continue;
        };

        let mut value = value.clone();
        let mut cursor = end;
        while bytes.get(cursor) == Some(&b'.') {
            let method_end = name_end(bytes, cursor + 1);
            let Some(method) = VariableMethod::parse(&text[cursor + 1..method_end]) else {
                break;
            };
            value = method.apply(&value);
            cursor = method_end;
        }
        edits.push(Edit::new(Span::new(i, cursor), value));
        i = cursor;
    }
    apply_edits(text, &edits)
}

//! Inline functions: `[shuffle: a, b, c]` and `[clean: text]`

use rand::seq::SliceRandom;
use rand::Rng;

use crate::span::{apply_edits, Edit, Span};

use super::cleanup::{collapse_commas, normalize_whitespace};
use super::find_ignore_ascii_case;

/// Calls of `keyword` (lowercase, including the colon) whose argument runs
/// to the first `]` on the same line
fn find_calls(text: &str, keyword: &str) -> Vec<(Span, String)> {
    let mut calls = Vec::new();
    let mut from = 0;
    while let Some(start) = find_ignore_ascii_case(text, keyword, from) {
        let args_start = start + keyword.len();
        let rest = &text[args_start..];
        match rest.find([']', '\n']) {
            Some(close) if rest.as_bytes()[close] == b']' => {
                let end = args_start + close + 1;
                calls.push((Span::new(start, end), rest[..close].to_string()));
                from = end;
            }
            _ => from = start + 1,
        }
    }
    calls
}

fn rewrite_calls<F: FnMut(&str) -> String>(text: &str, keyword: &str, mut f: F) -> String {
    let calls = find_calls(text, keyword);
    if calls.is_empty() {
        return text.to_string();
    }
    let edits: Vec<Edit> = calls
        .into_iter()
        .map(|(span, args)| Edit::new(span, f(&args)))
        .collect();
    apply_edits(text, &edits)
}

/// Randomly reorder comma-separated items
pub fn shuffle<R: Rng>(args: &str, rng: &mut R) -> String {
    let mut items: Vec<&str> = args.split(',').map(str::trim).collect();
    items.shuffle(rng);
    items.join(", ")
}

/// Collapse whitespace and stray comma spacing
pub fn clean(args: &str) -> String {
    let text = normalize_whitespace(&collapse_commas(args));
    text.replace(" ,", ",")
        .trim_matches(|c| c == ',' || c == ' ')
        .to_string()
}

/// Run `[shuffle:]` then `[clean:]` over the text
pub fn function_pass<R: Rng>(text: &str, rng: &mut R) -> String {
    let shuffled = rewrite_calls(text, "[shuffle:", |args| shuffle(args, rng));
    rewrite_calls(&shuffled, "[clean:", clean)
}

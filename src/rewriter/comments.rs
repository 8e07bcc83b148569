//! Comment stripping for templates and selected values
//!
//! `//` and `#` start comments, except that a `#` directly after a reference
//! opener (`__#` or `<#`) belongs to seed-id syntax and is kept.

/// Stand-in for a protected `#` while comments are cut
const HASH_GUARD: char = '\u{E000}';

/// Strip line comments, trim every line and drop the blank ones
pub fn strip_comments(template: &str) -> String {
    let protected = template
        .replace("__#", &format!("__{}", HASH_GUARD))
        .replace("<#", &format!("<{}", HASH_GUARD));

    protected
        .lines()
        .map(|line| {
            let line = line.split("//").next().unwrap_or_default();
            let line = line.split('#').next().unwrap_or_default();
            line.trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .replace(HASH_GUARD, "#")
}

/// Cut a selected value at its first unprotected `#`
pub fn strip_comment(value: &str) -> String {
    match comment_start(value) {
        Some(idx) => value[..idx].trim().to_string(),
        None => value.to_string(),
    }
}

fn comment_start(value: &str) -> Option<usize> {
    value.match_indices('#').map(|(i, _)| i).find(|&i| {
        let before = &value[..i];
        !(before.ends_with("__") || before.ends_with('<'))
    })
}

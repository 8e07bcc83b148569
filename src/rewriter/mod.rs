//! Rewrite passes over template text
//!
//! Every pass scans the whole template, producing a list of non-overlapping
//! [`Edit`](crate::span::Edit)s (leftmost match wins) that are applied in a
//! single left-to-right rewrite. Replacements are computed in match order, so
//! seeded randomness is consumed in a stable sequence.
//!
//! Pure passes take only text (and an RNG when they choose); the reference and
//! variable-assign passes also consult the [`Selector`](crate::selector::Selector).

pub mod choice;
pub mod cleanup;
pub mod comments;
pub mod conditional;
pub mod functions;
pub mod negatives;
pub mod reference;
pub mod settings;
pub mod variables;

pub use choice::choice_pass;
pub use cleanup::final_cleanup;
pub use comments::{strip_comment, strip_comments};
pub use conditional::conditional_pass;
pub use functions::function_pass;
pub use negatives::{strip_negative_tags, NegativeTags};
pub use reference::{reference_pass, MAX_REFERENCE_SWEEPS};
pub use settings::{extract_settings, InlineSettings};
pub use variables::{assign_pass, use_pass, MAX_ASSIGN_DEPTH};

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`
/// (which must be lowercase ASCII) in `haystack` at or after `from`
pub(crate) fn find_ignore_ascii_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() || from > hay.len() - needle.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| {
        hay[i..i + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| a.to_ascii_lowercase() == *b)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_ignore_ascii_case() {
        assert_eq!(find_ignore_ascii_case("a [IF x", "[if", 0), Some(2));
        assert_eq!(find_ignore_ascii_case("a [IF x", "[if", 3), None);
        assert_eq!(find_ignore_ascii_case("ab", "abc", 0), None);
    }
}

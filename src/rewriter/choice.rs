//! Choice-set pass: `{a|b|c}`, `{~a|b}`, `{30%a|b}`, `{1-2$$a|b|c}`
//!
//! Only innermost groups (no braces inside) are rewritten per pass; outer
//! groups resolve on later fixpoint iterations.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::selector::range::CountRange;
use crate::span::{apply_edits, Edit, Span};

/// Spans of every innermost `{...}` group, braces included
pub fn find_choice_groups(text: &str) -> Vec<Span> {
    let mut groups = Vec::new();
    let mut open = None;
    for (i, b) in text.bytes().enumerate() {
        match b {
            b'{' => open = Some(i),
            b'}' => {
                if let Some(start) = open.take() {
                    groups.push(Span::new(start, i + 1));
                }
            }
            _ => {}
        }
    }
    groups
}

fn split_variants(content: &str) -> Vec<String> {
    content.split('|').map(|s| s.trim().to_string()).collect()
}

/// Resolve the inside of one choice group
pub fn resolve_choice<R: Rng>(content: &str, rng: &mut R, seed: u64) -> String {
    let mut content = content;

    if let Some(rest) = content.strip_prefix('~') {
        content = rest;
        if !content.contains("$$") {
            let variants = split_variants(content);
            return variants[(seed % variants.len() as u64) as usize].clone();
        }
    }

    if content.contains('%') && !content.contains("$$") {
        if let Some((chance, options)) = content.split_once('%') {
            if let Ok(chance) = chance.trim().parse::<f64>() {
                let options = split_variants(options);
                if rng.gen::<f64>() * 100.0 < chance {
                    return options[0].clone();
                }
                return options[1..].choose(rng).cloned().unwrap_or_default();
            }
        }
    }

    if let Some((range, variants)) = content.split_once("$$") {
        let variants = split_variants(variants);
        let range = CountRange::parse(range, variants.len()).unwrap_or_default();
        return range.sample_joined(rng, &variants);
    }

    split_variants(content).choose(rng).cloned().unwrap_or_default()
}

/// Resolve every innermost choice group once
pub fn choice_pass<R: Rng>(text: &str, rng: &mut R, seed: u64) -> String {
    let groups = find_choice_groups(text);
    if groups.is_empty() {
        return text.to_string();
    }
    let edits: Vec<Edit> = groups
        .into_iter()
        .map(|span| {
            let content = &text[span.start + 1..span.end - 1];
            Edit::new(span, resolve_choice(content, rng, seed))
        })
        .collect();
    apply_edits(text, &edits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_innermost_groups_only() {
        let spans = find_choice_groups("{a|{b|c}} {d}");
        assert_eq!(spans, vec![Span::new(3, 8), Span::new(10, 13)]);
    }

    #[test]
    fn test_plain_choice() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = choice_pass("I like {red|blue} things", &mut rng, seed);
            assert!(out == "I like red things" || out == "I like blue things");
        }
    }

    #[test]
    fn test_sequential_choice_uses_seed() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(resolve_choice("~a|b|c", &mut rng, 4), "b");
        assert_eq!(resolve_choice("~a|b|c", &mut rng, 6), "a");
    }

    #[test]
    fn test_percentage_choice_extremes() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(resolve_choice("100%always|never", &mut rng, 0), "always");
            assert_eq!(resolve_choice("0%never|always", &mut rng, 0), "always");
            assert_eq!(resolve_choice("0%never", &mut rng, 0), "");
        }
    }

    #[test]
    fn test_percentage_falls_back_when_not_numeric() {
        let mut rng = StdRng::seed_from_u64(3);
        let out = resolve_choice("half%off|full", &mut rng, 0);
        assert!(out == "half%off" || out == "full");
    }

    #[test]
    fn test_counted_choice() {
        let mut rng = StdRng::seed_from_u64(9);
        let out = resolve_choice("2$$a|b|c", &mut rng, 0);
        assert_eq!(out.split(", ").count(), 2);
        let out = resolve_choice("x$$a|b|c", &mut rng, 0);
        assert_eq!(out.split(", ").count(), 1);
    }

    #[test]
    fn test_nested_groups_resolve_over_passes() {
        let mut rng = StdRng::seed_from_u64(5);
        let once = choice_pass("{x|{y|y}}", &mut rng, 0);
        assert_eq!(once, "{x|y}");
        let twice = choice_pass(&once, &mut rng, 0);
        assert!(twice == "x" || twice == "y");
    }
}

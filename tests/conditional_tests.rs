//! Tests for `[if trigger: a|b]` blocks
use prompt_wildcards::{expand_with_seed, TagLibrary};
use std::fs;
use tempfile::TempDir;

fn library_with(files: &[(&str, &str)]) -> (TempDir, TagLibrary) {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    let library = TagLibrary::new(dir.path());
    (dir, library)
}

#[test]
fn test_innermost_conditional_resolves_first() {
    let (_dir, library) = library_with(&[]);
    assert_eq!(
        expand_with_seed(&library, "[if cat: [if dog: X|Y]|Z] cat dog", 1),
        "X cat dog"
    );
}

#[test]
fn test_conditional_sees_expanded_text() {
    let (_dir, library) = library_with(&[("animal.txt", "cat\n")]);
    assert_eq!(
        expand_with_seed(&library, "a __animal__ [if cat: with whiskers|without whiskers]", 1),
        "a cat with whiskers"
    );
}

#[test]
fn test_conditional_false_branch_defaults_to_empty() {
    let (_dir, library) = library_with(&[]);
    assert_eq!(expand_with_seed(&library, "a dog, [if cat: whiskers]", 1), "a dog");
}

#[test]
fn test_conditional_on_variable_value() {
    let (_dir, library) = library_with(&[]);
    for seed in 0..10 {
        let output = expand_with_seed(&library, "$time={night|day} $time [if night: stars|sun]", seed);
        assert!(output == "night stars" || output == "day sun", "got {}", output);
    }
}

#[test]
fn test_trigger_match_is_case_insensitive() {
    let (_dir, library) = library_with(&[]);
    assert_eq!(expand_with_seed(&library, "RED hair [IF red: warm|cold]", 1), "RED hair warm");
}

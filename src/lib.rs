//! Prompt Wildcards - a deterministic template expander for image prompts
//!
//! Templates reference tag files (`__colors__`, `<chars:[female]>`), choose
//! among inline alternatives (`{red|blue}`), bind variables (`$hair=__colors__`)
//! and branch on words in the result (`[if cat: whiskers]`). Expansion is
//! reproducible for a given seed and tag library.
//!
//! # Example
//!
//! ```
//! use prompt_wildcards::{expand_with_seed, TagLibrary};
//!
//! let dir = tempfile::TempDir::new().unwrap();
//! std::fs::write(dir.path().join("colors.txt"), "red\nblue\n").unwrap();
//!
//! let library = TagLibrary::new(dir.path());
//! let result = expand_with_seed(&library, "a __colors__ {cat|dog}", 42);
//! println!("{}", result);
//! ```
pub mod diagnostic;
pub mod driver;
pub mod grammar;
pub mod library;
pub mod rewriter;
pub mod selector;
pub mod source;
pub mod span;
pub mod trace;

/// Re-export main types for convenience
pub use driver::{ExpandOptions, Expander, Expansion, DEFAULT_SIZE, MAX_ITERATIONS};
pub use library::{Catalog, LibraryOptions, SourceIssue, TagLibrary, ALL_ENTRIES};
pub use selector::{AffixCollection, RunState, Selector, MAX_GLOB_ATTEMPTS, MAX_SELECTIONS_PER_NAME};
pub use source::{EntryRecord, ResolvedTags, SourceError, TagSource};
pub use trace::{Pass, TraceStep};

/// Expand a template with full options
///
/// # Example
/// ```
/// use prompt_wildcards::{expand, ExpandOptions, TagLibrary};
///
/// let dir = tempfile::TempDir::new().unwrap();
/// let library = TagLibrary::new(dir.path());
///
/// let options = ExpandOptions::new(7).with_negative("lowres");
/// let expansion = expand(&library, "a cat **blurry** @@width=768@@", &options);
/// assert_eq!(expansion.text, "a cat");
/// assert_eq!(expansion.negative, "lowres, blurry");
/// assert_eq!(expansion.width, 768);
/// ```
pub fn expand(library: &TagLibrary, template: &str, options: &ExpandOptions) -> Expansion {
    Expander::new(library).expand(template, options)
}

/// Expand a template with a seed and default options, returning only the text
///
/// This is a convenience function for deterministic output.
pub fn expand_with_seed(library: &TagLibrary, template: &str, seed: u64) -> String {
    expand(library, template, &ExpandOptions::new(seed)).text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn colors_library() -> (TempDir, TagLibrary) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("colors.txt"), "red\ngreen\nblue\n").unwrap();
        let library = TagLibrary::new(dir.path());
        (dir, library)
    }

    #[test]
    fn test_expand_with_seed() {
        let (_dir, library) = colors_library();
        let result = expand_with_seed(&library, "a __colors__ ball", 42);
        assert!(["a red ball", "a green ball", "a blue ball"].contains(&result.as_str()));
    }

    #[test]
    fn test_deterministic_output() {
        let (_dir, library) = colors_library();
        let template = "__colors__, {big|small} {cat|dog}, __2$$colors__";

        for seed in 0..20 {
            let result1 = expand_with_seed(&library, template, seed);
            let result2 = expand_with_seed(&library, template, seed);
            assert_eq!(result1, result2);
        }
    }

    #[test]
    fn test_missing_reference_expands_to_nothing() {
        let (_dir, library) = colors_library();
        assert_eq!(expand_with_seed(&library, "a __missing__ b", 1), "a b");
    }
}

//! Fixpoint driver: runs the rewrite passes until the template settles
//!
//! One call to [`Expander::expand`] is one run. Run state starts empty, the
//! variable table is seeded from the library's globals, and the loop
//! (assign, use, reference, choice) repeats until an iteration leaves the
//! text unchanged or [`MAX_ITERATIONS`] is reached. Conditionals, affixes,
//! negatives, cleanup and inline settings then run once over the result.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::library::TagLibrary;
use crate::rewriter::{
    assign_pass, choice_pass, conditional_pass, extract_settings, final_cleanup, reference_pass,
    strip_comments, strip_negative_tags, use_pass, NegativeTags,
};
use crate::selector::{AffixCollection, Selector};
use crate::trace::{Pass, TraceStep, Tracer};

/// Fixpoint iterations allowed per run
pub const MAX_ITERATIONS: usize = 50;

/// Default output width and height
pub const DEFAULT_SIZE: u32 = 1024;

/// Options for one expansion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Seeds the run's RNG and sequential picks
    pub seed: u64,
    /// Drop the library's parse cache before expanding
    pub refresh: bool,
    pub width: u32,
    pub height: u32,
    /// Caller negative prompt the generated negatives are appended to
    pub negative: String,
    /// Record a [`TraceStep`] for every pass that changes the text
    pub trace: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        ExpandOptions {
            seed: 0,
            refresh: false,
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            negative: String::new(),
            trace: false,
        }
    }
}

impl ExpandOptions {
    /// Create options for the given seed
    pub fn new(seed: u64) -> Self {
        ExpandOptions {
            seed,
            ..Default::default()
        }
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Set the default size inline settings can override
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_negative(mut self, negative: impl Into<String>) -> Self {
        self.negative = negative.into();
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// Result of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expansion {
    pub text: String,
    /// Caller negative prompt plus every generated negative, comma-joined
    pub negative: String,
    pub width: u32,
    pub height: u32,
    pub affixes: AffixCollection,
    pub scoped_negatives: Vec<String>,
    /// Fixpoint iterations the run took
    pub iterations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceStep>>,
}

/// Expands templates against a tag library
pub struct Expander<'a> {
    library: &'a TagLibrary,
}

impl<'a> Expander<'a> {
    pub fn new(library: &'a TagLibrary) -> Self {
        Expander { library }
    }

    /// Expand `template` to a fixpoint and post-process the result
    pub fn expand(&self, template: &str, options: &ExpandOptions) -> Expansion {
        if options.refresh {
            self.library.refresh();
        }
        let mut tracer = Tracer::new(options.trace);

        let mut text = strip_comments(template);
        tracer.record(Pass::Comments, 0, template, &text);

        let rng = StdRng::seed_from_u64(options.seed);
        let mut selector = Selector::new(self.library, rng, options.seed);
        selector.state.variables = self.library.load_global_defaults();

        let mut iterations = 0;
        loop {
            if iterations >= MAX_ITERATIONS {
                warn!(
                    "Template did not settle after {} iterations, stopping",
                    MAX_ITERATIONS
                );
                break;
            }
            iterations += 1;
            let previous = text.clone();

            let assigned = assign_pass(&text, &mut selector);
            tracer.record(Pass::Assign, iterations, &text, &assigned);

            let used = use_pass(&assigned, &selector.state.variables);
            tracer.record(Pass::Use, iterations, &assigned, &used);

            let referenced = reference_pass(&used, &mut selector);
            tracer.record(Pass::Reference, iterations, &used, &referenced);

            let seed = selector.seed();
            text = choice_pass(&referenced, selector.rng_mut(), seed);
            tracer.record(Pass::Choice, iterations, &referenced, &text);

            if text == previous {
                break;
            }
        }
        debug!("Expansion settled after {} iterations", iterations);

        let conditioned = conditional_pass(&text);
        tracer.record(Pass::Conditional, 0, &text, &conditioned);
        text = conditioned;

        let affixes = selector.state.collect_affixes();
        let with_affixes = attach_affixes(&text, &affixes);
        tracer.record(Pass::Affixes, 0, &text, &with_affixes);
        text = with_affixes;

        let mut negatives = NegativeTags::new();
        negatives.extend(&affixes.negative_prefixes);
        negatives.extend(&affixes.negative_suffixes);
        negatives.extend(&selector.state.scoped_negatives);
        let (stripped, inline_negatives) = strip_negative_tags(&text);
        negatives.extend(&inline_negatives);
        tracer.record(Pass::Negatives, 0, &text, &stripped);

        let cleaned = final_cleanup(&stripped);
        tracer.record(Pass::Cleanup, 0, &stripped, &cleaned);

        let (text, settings) = extract_settings(&cleaned);
        tracer.record(Pass::Settings, 0, &cleaned, &text);
        let (width, height) = settings.resolve(options.width, options.height);

        Expansion {
            text: text.trim().to_string(),
            negative: negatives.to_prompt(&options.negative),
            width,
            height,
            affixes,
            scoped_negatives: selector.state.scoped_negatives,
            iterations,
            trace: tracer.finish(),
        }
    }
}

/// Prepend prefixes and append suffixes, comma-joined
fn attach_affixes(text: &str, affixes: &AffixCollection) -> String {
    let mut out = String::new();
    if !affixes.prefixes.is_empty() {
        out.push_str(&affixes.prefixes.join(", "));
        out.push_str(", ");
    }
    out.push_str(text);
    if !affixes.suffixes.is_empty() {
        out.push_str(", ");
        out.push_str(&affixes.suffixes.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn test_attach_affixes() {
        let affixes = AffixCollection {
            prefixes: vec!["masterpiece".into(), "best quality".into()],
            suffixes: vec!["sharp".into()],
            ..Default::default()
        };
        assert_eq!(
            attach_affixes("a cat", &affixes),
            "masterpiece, best quality, a cat, sharp"
        );
        assert_eq!(attach_affixes("a cat", &AffixCollection::default()), "a cat");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let (_dir, library) = library_with(&[]);
        let expansion = Expander::new(&library).expand("a  quiet   street", &ExpandOptions::new(1));
        assert_eq!(expansion.text, "a quiet street");
        assert_eq!(expansion.iterations, 1);
        assert_eq!((expansion.width, expansion.height), (1024, 1024));
        assert!(expansion.trace.is_none());
    }

    #[test]
    fn test_full_pipeline() {
        let (_dir, library) = library_with(&[("animal.txt", "cat\n")]);
        let template = "$pet=__animal__ a $pet.upper [if cat: purring|silent] **blurry** @@width=640@@";
        let options = ExpandOptions::new(3).with_negative("lowres");
        let expansion = Expander::new(&library).expand(template, &options);
        assert_eq!(expansion.text, "a CAT purring");
        assert_eq!(expansion.negative, "lowres, blurry");
        assert_eq!((expansion.width, expansion.height), (640, 1024));
    }

    #[test]
    fn test_trace_records_changed_passes() {
        let (_dir, library) = library_with(&[("animal.txt", "cat\n")]);
        let options = ExpandOptions::new(3).with_trace(true);
        let expansion = Expander::new(&library).expand("a __animal__", &options);
        let trace = expansion.trace.unwrap();
        assert!(trace.iter().any(|s| s.pass == Pass::Reference && s.output == "a cat"));
        assert!(trace.iter().all(|s| s.pass != Pass::Choice));
    }

    #[test]
    fn test_runaway_template_stops() {
        let (_dir, library) = library_with(&[("grow.txt", "x __grow__\n")]);
        let expansion = Expander::new(&library).expand("__grow__", &ExpandOptions::new(9));
        assert!(expansion.iterations <= MAX_ITERATIONS);
    }
}

//! Selector: picks values for logical names under one run's state
//!
//! A [`Selector`] lives for exactly one expansion. It owns the seeded RNG and
//! the [`RunState`] every pass shares, and consults the [`TagLibrary`]
//! synchronously for each reference.

mod filter;
pub mod range;
mod select_impl;

pub use filter::FilterGroups;
pub use range::CountRange;

use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::library::TagLibrary;
use crate::source::EntryRecord;

/// Selections of one logical name allowed per run before the name is
/// replaced by a `LOOP_ERROR(name)` marker
pub const MAX_SELECTIONS_PER_NAME: usize = 500;

/// Glob matches tried before a glob reference gives up
pub const MAX_GLOB_ATTEMPTS: usize = 25;

/// Delimiter that splits a chosen value into positive and scoped negative text
pub const SCOPED_NEGATIVE: &str = "--neg:";

/// Prefixes and suffixes gathered from the structured entries a run selected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AffixCollection {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    pub negative_prefixes: Vec<String>,
    pub negative_suffixes: Vec<String>,
}

/// Mutable state of one expansion run
#[derive(Debug, Default)]
pub struct RunState {
    /// Raw values already handed out, avoided until a pool is exhausted
    pub used_values: HashSet<String>,
    /// Seed-id to the value first chosen for it
    pub seeded_values: HashMap<String, String>,
    /// `{seed}_{name}` to the nested resolution made under that seed
    pub resolved_seeds: HashMap<String, Option<String>>,
    /// Names currently being resolved
    pub processing_stack: HashSet<String>,
    pub variables: HashMap<String, String>,
    /// Reference name to the structured entry it resolved to, first-seen order
    pub selected_entries: Vec<(String, Arc<EntryRecord>)>,
    pub scoped_negatives: Vec<String>,
    pub selection_counts: HashMap<String, usize>,
}

impl RunState {
    /// Remember the entry a reference resolved to; a later selection through
    /// the same reference replaces it
    pub fn record_entry(&mut self, reference: &str, entry: Arc<EntryRecord>) {
        match self.selected_entries.iter_mut().find(|(r, _)| r == reference) {
            Some(slot) => slot.1 = entry,
            None => self.selected_entries.push((reference.to_string(), entry)),
        }
    }

    /// Split `text` at the scoped negative delimiter, keeping the negative part
    pub fn split_scoped_negative(&mut self, text: &str) -> String {
        match text.split_once(SCOPED_NEGATIVE) {
            Some((positive, negative)) => {
                let negative = negative.trim();
                if !negative.is_empty() {
                    self.scoped_negatives.push(negative.to_string());
                }
                positive.trim().to_string()
            }
            None => text.to_string(),
        }
    }

    /// Gather affixes of every selected entry. Affixes wrapped in `**...**`
    /// go to the negative side.
    pub fn collect_affixes(&self) -> AffixCollection {
        let mut affixes = AffixCollection::default();
        for (_, entry) in &self.selected_entries {
            for prefix in entry.prefixes.iter().filter(|p| !p.trim().is_empty()) {
                match negative_affix(prefix) {
                    Some(negative) => affixes.negative_prefixes.push(negative.to_string()),
                    None => affixes.prefixes.push(prefix.clone()),
                }
            }
            for suffix in entry.suffixes.iter().filter(|s| !s.trim().is_empty()) {
                match negative_affix(suffix) {
                    Some(negative) => affixes.negative_suffixes.push(negative.to_string()),
                    None => affixes.suffixes.push(suffix.clone()),
                }
            }
        }
        affixes
    }
}

fn negative_affix(affix: &str) -> Option<&str> {
    let inner = affix.trim().strip_prefix("**")?.strip_suffix("**")?;
    Some(inner.trim())
}

/// Picks values for references during one run
pub struct Selector<'a, R: Rng> {
    pub(super) library: &'a TagLibrary,
    pub(super) rng: R,
    pub(super) seed: u64,
    pub state: RunState,
}

impl<'a, R: Rng> Selector<'a, R> {
    /// Create a selector with fresh run state. `seed` drives sequential
    /// (`~`) picks; `rng` drives everything else.
    pub fn new(library: &'a TagLibrary, rng: R, seed: u64) -> Self {
        Selector {
            library,
            rng,
            seed,
            state: RunState::default(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, prefixes: &[&str], suffixes: &[&str]) -> Arc<EntryRecord> {
        Arc::new(EntryRecord {
            title: title.to_string(),
            prefixes: prefixes.iter().map(|s| s.to_string()).collect(),
            suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        })
    }

    #[test]
    fn test_collect_affixes_routes_negatives() {
        let mut state = RunState::default();
        state.record_entry("chars", entry("Ninja", &["masterpiece", "**lowres**"], &["dynamic pose", ""]));
        let affixes = state.collect_affixes();
        assert_eq!(affixes.prefixes, vec!["masterpiece"]);
        assert_eq!(affixes.negative_prefixes, vec!["lowres"]);
        assert_eq!(affixes.suffixes, vec!["dynamic pose"]);
        assert!(affixes.negative_suffixes.is_empty());
    }

    #[test]
    fn test_record_entry_replaces_same_reference() {
        let mut state = RunState::default();
        state.record_entry("chars", entry("A", &["a"], &[]));
        state.record_entry("chars", entry("B", &["b"], &[]));
        assert_eq!(state.selected_entries.len(), 1);
        assert_eq!(state.selected_entries[0].1.title, "B");
    }

    #[test]
    fn test_split_scoped_negative() {
        let mut state = RunState::default();
        assert_eq!(state.split_scoped_negative("red hair --neg: blue hair"), "red hair");
        assert_eq!(state.split_scoped_negative("plain"), "plain");
        assert_eq!(state.split_scoped_negative("x --neg:  "), "x");
        assert_eq!(state.scoped_negatives, vec!["blue hair"]);
    }
}

//! Selection logic for the Selector
//!
//! Reference forms handled here, after decoration is stripped:
//! - `name` plain pick, unused values first
//! - `~name` sequential pick at `seed % len`
//! - `#1|2$$name` pick memoized under a seed-id
//! - `1-3$$name` counted subset
//! - `name*` glob over every resolvable name
//! - `name` with filter groups, narrowing a structured source

use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::rewriter::strip_comment;
use crate::source::{EntryRecord, ResolvedTags};

use super::{CountRange, FilterGroups, Selector, MAX_GLOB_ATTEMPTS, MAX_SELECTIONS_PER_NAME};

/// Remove reference delimiters: `__`, `<` and `>`
pub(crate) fn strip_decorations(reference: &str) -> String {
    reference
        .replace("__", "")
        .replace(['<', '>'], "")
        .trim()
        .to_string()
}

/// Split `#1|2$$target` into its seed-ids and target name
fn parse_seed_reference(name: &str) -> Option<(Vec<&str>, &str)> {
    let (ids, target) = name.strip_prefix('#')?.split_once("$$")?;
    if !ids.chars().all(|c| c.is_ascii_digit() || c == '|') {
        return None;
    }
    let ids: Vec<&str> = ids.split('|').filter(|id| !id.is_empty()).collect();
    if ids.is_empty() {
        return None;
    }
    Some((ids, target.trim()))
}

/// Split `1-3$$target` into the range text and target name
fn parse_range_reference(name: &str) -> Option<(&str, &str)> {
    let (range, target) = name.split_once("$$")?;
    if range.chars().any(|c| c.is_ascii_digit() || c == '-') {
        Some((range, target.trim()))
    } else {
        None
    }
}

fn is_glob(name: &str) -> bool {
    name.contains(['*', '?'])
}

/// Inner name of a value that is exactly one wrapped reference
fn nested_reference(value: &str) -> Option<&str> {
    let inner = value
        .strip_prefix("__")
        .and_then(|v| v.strip_suffix("__"))
        .or_else(|| value.strip_prefix('<').and_then(|v| v.strip_suffix('>')))?;
    // Anything richer than a bare name is left to the reference pass
    if inner.is_empty() || inner.contains("__") || inner.contains(['<', '>', ':', '[']) {
        return None;
    }
    Some(inner)
}

impl<'a, R: Rng> Selector<'a, R> {
    /// Select a value for a reference.
    ///
    /// `None` means the name has nothing behind it; the caller decides
    /// whether that leaves the reference verbatim or expands to nothing.
    pub fn select(&mut self, reference: &str, groups: Option<&[String]>) -> Option<String> {
        let name = strip_decorations(reference);

        let count = self.state.selection_counts.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count > MAX_SELECTIONS_PER_NAME {
            if *count == MAX_SELECTIONS_PER_NAME + 1 {
                warn!("Selection ceiling reached for '{}'", name);
            }
            return Some(format!("LOOP_ERROR({})", name));
        }

        let pushed = self.state.processing_stack.insert(name.clone());
        let selected = self.select_name(&name, groups);
        if pushed {
            self.state.processing_stack.remove(&name);
        }
        selected
    }

    fn select_name(&mut self, name: &str, groups: Option<&[String]>) -> Option<String> {
        let (sequential, name) = match name.strip_prefix('~') {
            Some(rest) => (true, rest.trim()),
            None => (false, name),
        };

        if name.starts_with('#') {
            let (ids, target) = parse_seed_reference(name)?;
            return self.select_seeded(&ids, target, groups);
        }

        if let Some((range, target)) = parse_range_reference(name) {
            return self.select_range(range, target);
        }

        if groups.is_none() && is_glob(name) {
            return self.select_glob(name, sequential);
        }

        if let Some(groups) = groups {
            return Some(self.select_filtered(name, groups));
        }

        let tags = self.library.resolve(name);
        if tags.is_empty() {
            return None;
        }
        if sequential {
            if let Some(value) = self.select_sequential(&tags) {
                return Some(value);
            }
        }
        self.select_plain(name, &tags)
    }

    /// Pick among `candidates`, preferring ones not yet used this run
    fn pick_unused(&mut self, candidates: &[String]) -> Option<String> {
        if candidates.len() == 1 {
            return Some(candidates[0].clone());
        }
        let unused: Vec<&String> = candidates
            .iter()
            .filter(|c| !self.state.used_values.contains(*c))
            .collect();
        if unused.is_empty() {
            candidates.choose(&mut self.rng).cloned()
        } else {
            unused.choose(&mut self.rng).map(|c| (*c).clone())
        }
    }

    fn entry_for(&self, title: &str, tags: &ResolvedTags) -> Option<Arc<EntryRecord>> {
        tags.entries()
            .iter()
            .find(|e| e.title == title)
            .cloned()
            .or_else(|| self.library.entry_details(title))
    }

    /// Turn a chosen raw value into output text: swap a structured title for
    /// one of its prompts, cut comments, split off scoped negatives and
    /// resolve a nested reference
    fn finish(
        &mut self,
        reference: &str,
        value: &str,
        tags: &ResolvedTags,
        seed_id: Option<&str>,
    ) -> String {
        let mut value = value.to_string();
        if let Some(entry) = self.entry_for(&value, tags) {
            self.state.record_entry(reference, entry.clone());
            if let Some(prompt) = entry.prompts.choose(&mut self.rng) {
                value = prompt.clone();
            }
        }
        let value = strip_comment(&value);
        let value = self.state.split_scoped_negative(&value);
        self.resolve_nested(&value, seed_id)
    }

    fn select_plain(&mut self, name: &str, tags: &ResolvedTags) -> Option<String> {
        if let ResolvedTags::Table(rows) = tags {
            return rows.choose(&mut self.rng).map(|row| row.encode());
        }
        let candidates = tags.candidates();
        let selected = self.pick_unused(&candidates)?;
        self.state.used_values.insert(selected.clone());
        Some(self.finish(name, &selected, tags, None))
    }

    fn select_sequential(&mut self, tags: &ResolvedTags) -> Option<String> {
        let seed = self.seed;
        let index = |len: usize| (seed % len as u64) as usize;
        match tags {
            ResolvedTags::Table(rows) if !rows.is_empty() => Some(rows[index(rows.len())].encode()),
            ResolvedTags::List(_) | ResolvedTags::FlatNested(_) => {
                let candidates = tags.candidates();
                if candidates.is_empty() {
                    return None;
                }
                let selected = strip_comment(&candidates[index(candidates.len())]);
                let selected = self.state.split_scoped_negative(&selected);
                let seed_id = self.seed.to_string();
                Some(self.resolve_nested(&selected, Some(&seed_id)))
            }
            _ => None,
        }
    }

    fn select_seeded(
        &mut self,
        ids: &[&str],
        target: &str,
        groups: Option<&[String]>,
    ) -> Option<String> {
        let id = ids.choose(&mut self.rng)?.to_string();
        let reference = format!("#{}$${}", id, target);
        let tags = self.library.resolve(target);

        if let Some(memo) = self.state.seeded_values.get(&id).cloned() {
            return Some(self.finish(&reference, &memo, &tags, Some(&id)));
        }

        let candidates = match groups {
            Some(groups) => self.filtered_titles(&tags, groups),
            None => tags.candidates(),
        };
        let selected = self.pick_unused(&candidates)?;
        debug!("Seed-id {} bound to '{}'", id, selected);
        self.state.seeded_values.insert(id.clone(), selected.clone());
        self.state.used_values.insert(selected.clone());
        Some(self.finish(&reference, &selected, &tags, Some(&id)))
    }

    fn select_range(&mut self, range: &str, target: &str) -> Option<String> {
        let candidates = self.library.resolve(target).candidates();
        if candidates.is_empty() {
            return None;
        }
        let range = CountRange::parse(range, candidates.len()).unwrap_or_default();
        Some(range.sample_joined(&mut self.rng, &candidates))
    }

    fn select_glob(&mut self, pattern: &str, sequential: bool) -> Option<String> {
        let mut matches = self.library.glob(pattern);
        if matches.is_empty() {
            debug!("Glob '{}' matched nothing", pattern);
            return None;
        }
        matches.shuffle(&mut self.rng);
        for name in matches.iter().take(MAX_GLOB_ATTEMPTS) {
            let reference = if sequential {
                format!("~{}", name)
            } else {
                name.clone()
            };
            if let Some(value) = self.select(&reference, None) {
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
        Some(String::new())
    }

    fn filtered_titles(&self, tags: &ResolvedTags, groups: &[String]) -> Vec<String> {
        let filter = FilterGroups::parse(groups, &self.state.variables);
        tags.entries()
            .iter()
            .filter(|entry| filter.matches(&entry.tags))
            .map(|entry| entry.title.clone())
            .collect()
    }

    fn select_filtered(&mut self, name: &str, groups: &[String]) -> String {
        let tags = self.library.resolve(name);
        let candidates = self.filtered_titles(&tags, groups);
        let Some(selected) = self.pick_unused(&candidates) else {
            debug!("No entries of '{}' match {:?}", name, groups);
            return String::new();
        };
        self.state.used_values.insert(selected.clone());
        self.finish(name, &selected, &tags, None)
    }

    /// Resolve a value that is itself one wrapped reference. A name already
    /// being resolved is returned verbatim.
    fn resolve_nested(&mut self, value: &str, seed_id: Option<&str>) -> String {
        let Some(nested) = nested_reference(value) else {
            return value.to_string();
        };
        if self.state.processing_stack.contains(nested) {
            return value.to_string();
        }
        let memo_key = seed_id.map(|id| format!("{}_{}", id, nested));
        if let Some(memo) = memo_key.as_ref().and_then(|k| self.state.resolved_seeds.get(k)) {
            return memo.clone().unwrap_or_else(|| value.to_string());
        }

        let resolved = self.select(nested, None);
        if let Some(key) = memo_key {
            self.state.resolved_seeds.insert(key, resolved.clone());
        }
        resolved.unwrap_or_else(|| value.to_string())
    }
}

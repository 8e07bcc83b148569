//! Filter groups narrowing a structured source: `[female][--male][red|blue]`

use std::collections::{BTreeSet, HashMap};

/// Parsed filter tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterGroups {
    /// Every one must be present
    pub positive: BTreeSet<String>,
    /// None may be present
    pub negative: BTreeSet<String>,
    /// Each group needs at least one member present
    pub any: Vec<BTreeSet<String>>,
}

impl FilterGroups {
    /// Parse group tokens. A token `$name` naming a known variable is
    /// replaced by that variable's value first.
    pub fn parse(groups: &[String], variables: &HashMap<String, String>) -> Self {
        let mut filter = FilterGroups::default();
        for group in groups {
            let mut token = group.trim();
            if let Some(value) = token.strip_prefix('$').and_then(|name| variables.get(name)) {
                token = value.trim();
            }
            if let Some(negative) = token.strip_prefix("--") {
                let negative = negative.trim().to_lowercase();
                if !negative.is_empty() {
                    filter.negative.insert(negative);
                }
            } else if token.contains('|') {
                let members: BTreeSet<String> = token
                    .split('|')
                    .map(|m| m.trim().to_lowercase())
                    .filter(|m| !m.is_empty())
                    .collect();
                if !members.is_empty() {
                    filter.any.push(members);
                }
            } else if !token.is_empty() {
                filter.positive.insert(token.to_lowercase());
            }
        }
        filter
    }

    pub fn matches(&self, tags: &BTreeSet<String>) -> bool {
        self.positive.is_subset(tags)
            && self.negative.is_disjoint(tags)
            && self.any.iter().all(|group| !group.is_disjoint(tags))
    }
}

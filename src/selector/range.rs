//! Counted-subset requests: `2$$name`, `1-3$$name`, `-2$$name`, `{2-3$$a|b|c}`

use rand::seq::index;
use rand::Rng;

/// Inclusive bounds on how many distinct items to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRange {
    pub low: usize,
    pub high: usize,
}

impl Default for CountRange {
    fn default() -> Self {
        CountRange { low: 1, high: 1 }
    }
}

impl CountRange {
    /// Parse a single count or a `low-high` span. An empty low side means
    /// 1, an empty high side means `available`. Bounds are reordered if
    /// given backwards. Anything unparsable is `None`.
    pub fn parse(text: &str, available: usize) -> Option<CountRange> {
        let text = text.trim();
        let parts: Vec<&str> = text.split('-').collect();
        match parts.as_slice() {
            [single] => {
                let n = single.trim().parse::<usize>().ok()?;
                Some(CountRange { low: n, high: n })
            }
            [low, high] => {
                let low = match low.trim() {
                    "" => 1,
                    s => s.parse::<usize>().ok()?,
                };
                let high = match high.trim() {
                    "" => available,
                    s => s.parse::<usize>().ok()?,
                };
                Some(CountRange {
                    low: low.min(high),
                    high: low.max(high),
                })
            }
            _ => None,
        }
    }

    /// Draw a count in the range, then that many distinct items (clamped to
    /// the pool), joined with `", "`
    pub fn sample_joined<R: Rng>(&self, rng: &mut R, items: &[String]) -> String {
        if items.is_empty() {
            return String::new();
        }
        let count = rng.gen_range(self.low..=self.high);
        if count == 0 {
            return String::new();
        }
        let amount = count.min(items.len());
        index::sample(rng, items.len(), amount)
            .into_iter()
            .map(|i| items[i].as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_forms() {
        assert_eq!(CountRange::parse("2", 5), Some(CountRange { low: 2, high: 2 }));
        assert_eq!(CountRange::parse("1-3", 5), Some(CountRange { low: 1, high: 3 }));
        assert_eq!(CountRange::parse("3-1", 5), Some(CountRange { low: 1, high: 3 }));
        assert_eq!(CountRange::parse("-2", 5), Some(CountRange { low: 1, high: 2 }));
        assert_eq!(CountRange::parse("2-", 5), Some(CountRange { low: 2, high: 5 }));
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(CountRange::parse("x", 5), None);
        assert_eq!(CountRange::parse("1-2-3", 5), None);
        assert_eq!(CountRange::parse("a-b", 5), None);
    }

    #[test]
    fn test_sample_is_distinct_and_clamped() {
        let items: Vec<String> = ["red", "green", "blue"].iter().map(|s| s.to_string()).collect();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = CountRange { low: 2, high: 2 }.sample_joined(&mut rng, &items);
            let parts: Vec<&str> = picked.split(", ").collect();
            assert_eq!(parts.len(), 2);
            assert_ne!(parts[0], parts[1]);

            let all = CountRange { low: 10, high: 10 }.sample_joined(&mut rng, &items);
            assert_eq!(all.split(", ").count(), 3);
        }
    }

    #[test]
    fn test_zero_count_is_empty() {
        let items = vec!["a".to_string()];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(CountRange { low: 0, high: 0 }.sample_joined(&mut rng, &items), "");
    }
}

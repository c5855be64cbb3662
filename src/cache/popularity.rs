//! Popularity-aware TTL selection.

use regex::Regex;
use std::time::Duration;

/// Decides which cache keys live longer than the base TTL.
///
/// A key is popular when it references one of the hot product ids
/// (`/product/<id>` followed by `/` or end of key) or the similar-ids
/// resource.
#[derive(Debug, Clone)]
pub struct PopularityPolicy {
    hot_ids: Option<Regex>,
    multiplier: u32,
}

const SIMILAR_IDS_MARKER: &str = "/similarids";

impl PopularityPolicy {
    pub fn new<S: AsRef<str>>(hot_ids: &[S], multiplier: u32) -> Self {
        let alternatives: Vec<String> = hot_ids
            .iter()
            .map(|id| regex::escape(id.as_ref()))
            .filter(|id| !id.is_empty())
            .collect();

        let hot_ids = if alternatives.is_empty() {
            None
        } else {
            // Escaped literals joined by `|` always compile.
            Regex::new(&format!(r"/product/({})(/|$)", alternatives.join("|"))).ok()
        };

        Self {
            hot_ids,
            multiplier: multiplier.max(1),
        }
    }

    pub fn is_popular(&self, key: &str) -> bool {
        key.contains(SIMILAR_IDS_MARKER)
            || self.hot_ids.as_ref().is_some_and(|re| re.is_match(key))
    }

    pub fn effective_ttl(&self, key: &str, base: Duration) -> Duration {
        if self.is_popular(key) {
            base.saturating_mul(self.multiplier)
        } else {
            base
        }
    }
}

impl Default for PopularityPolicy {
    fn default() -> Self {
        let hot: Vec<String> = (1..=10).map(|id| id.to_string()).collect();
        Self::new(&hot, 3)
    }
}

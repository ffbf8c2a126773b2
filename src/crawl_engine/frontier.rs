//! The set of URIs a run has admitted, and the filter deciding admission
//!
//! Every candidate link passes the same pipeline, in order: resolve against
//! the page it came from, drop blanks, drop non-http(s) schemes, trim the
//! fragment, drop duplicates, drop out-of-range URIs, then apply exclusion
//! globs and the user predicate. Each step can be switched off in
//! [`CrawlConfig`].

use log::{debug, trace};
use std::collections::HashSet;
use url::Url;

use crate::config::CrawlConfig;
use crate::utils::{is_valid_url, range_prefix, resolve_link, trim_fragment};

/// URI prefixes a range-restricted crawl may not leave
///
/// Filled once from the seeds and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    prefixes: Vec<String>,
}

impl RangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// True when `uri` starts with any prefix
    #[must_use]
    pub fn test(&self, uri: &str) -> bool {
        self.prefixes.iter().any(|prefix| uri.starts_with(prefix.as_str()))
    }

    fn seed(&mut self, uris: &[String]) {
        for uri in uris {
            let prefix = range_prefix(uri);
            if !self.prefixes.contains(&prefix) {
                self.prefixes.push(prefix);
            }
        }
    }
}

/// Ordered record of admitted URIs, in discovery order
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    order: Vec<String>,
    seen: HashSet<String>,
    range: RangeSet,
}

impl Frontier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.seen.contains(uri)
    }

    /// All admitted URIs in the order they were admitted
    #[must_use]
    pub fn uris(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn range(&self) -> &RangeSet {
        &self.range
    }

    /// Filter `candidates` and append the survivors
    ///
    /// `origin` is the URI of the page the candidates were found on; `None`
    /// marks a seed batch. Seeds bypass the range check, and the first seed
    /// batch defines the range. Returns the admitted URIs in order.
    pub fn admit<S: AsRef<str>>(
        &mut self,
        candidates: &[S],
        origin: Option<&str>,
        config: &CrawlConfig,
    ) -> Vec<String> {
        let base = match origin {
            Some(origin) if config.resolve_relative() => Url::parse(origin).ok(),
            _ => None,
        };
        let check_range = config.stay_in_range() && origin.is_some();

        let mut batch: HashSet<String> = HashSet::new();
        let mut admitted = Vec::new();

        for raw in candidates {
            let raw = raw.as_ref();
            let resolved = if config.resolve_relative() {
                resolve_link(base.as_ref(), raw)
            } else {
                Some(raw.trim().to_string()).filter(|uri| !uri.is_empty())
            };
            let Some(mut uri) = resolved else {
                continue;
            };

            if config.http_only() && !is_valid_url(&uri) {
                trace!(target: "tarantula::frontier", "Dropping non-http link {uri}");
                continue;
            }

            if config.trim_hashes() {
                let trimmed = trim_fragment(&uri).len();
                uri.truncate(trimmed);
            }

            if config.skip_dupes() && (self.seen.contains(&uri) || batch.contains(&uri)) {
                continue;
            }

            if check_range && !self.range.test(&uri) {
                trace!(target: "tarantula::frontier", "Dropping out-of-range link {uri}");
                continue;
            }

            if config
                .excluded_patterns_compiled()
                .iter()
                .any(|pattern| pattern.is_match(&uri))
            {
                trace!(target: "tarantula::frontier", "Dropping excluded link {uri}");
                continue;
            }

            if let Some(predicate) = config.should_visit()
                && !predicate.allows(&uri)
            {
                continue;
            }

            batch.insert(uri.clone());
            admitted.push(uri);
        }

        if origin.is_none() && self.range.is_empty() {
            self.range.seed(&admitted);
            debug!(
                target: "tarantula::frontier",
                "Range initialised: {:?}",
                self.range.prefixes()
            );
        }

        for uri in &admitted {
            self.seen.insert(uri.clone());
            self.order.push(uri.clone());
        }

        debug!(
            target: "tarantula::frontier",
            "Admitted {} of {} candidates (frontier {})",
            admitted.len(),
            candidates.len(),
            self.order.len()
        );
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_set_matches_by_prefix() {
        let mut range = RangeSet::default();
        range.seed(&["http://ex.com/docs/intro".to_string()]);
        assert!(range.test("http://ex.com/docs/other"));
        assert!(!range.test("http://ex.com/blog/"));
    }

    #[test]
    fn second_seed_batch_leaves_range_alone() {
        let config = CrawlConfig::default();
        let mut frontier = Frontier::new();
        frontier.admit(&["http://a.com/x"], None, &config);
        frontier.admit(&["http://b.com/y"], None, &config);
        assert_eq!(frontier.range().prefixes(), ["http://a.com/".to_string()]);
    }

    #[test]
    fn dupes_kept_when_dedup_off() {
        let config = CrawlConfig::builder().skip_dupes(false).build().unwrap();
        let mut frontier = Frontier::new();
        frontier.admit(&["http://a.com/", "http://a.com/"], None, &config);
        assert_eq!(frontier.len(), 2);
    }
}

//! Getter methods for `CrawlConfig`
//!
//! This module provides all the accessor methods for retrieving configuration
//! values from a `CrawlConfig` instance.

use std::sync::Arc;
use std::time::Duration;

use super::types::{AdmissionPredicate, ClientKind, CrawlConfig, Headers, ProxySettings};
use crate::client::LinkExtractor;

impl CrawlConfig {
    #[must_use]
    pub fn legs(&self) -> usize {
        self.legs
    }

    #[must_use]
    pub fn max_uses(&self) -> u32 {
        self.max_uses
    }

    #[must_use]
    pub fn trim_hashes(&self) -> bool {
        self.trim_hashes
    }

    #[must_use]
    pub fn skip_dupes(&self) -> bool {
        self.skip_dupes
    }

    #[must_use]
    pub fn stay_in_range(&self) -> bool {
        self.stay_in_range
    }

    #[must_use]
    pub fn resolve_relative(&self) -> bool {
        self.resolve_relative
    }

    #[must_use]
    pub fn http_only(&self) -> bool {
        self.http_only
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&ProxySettings> {
        self.proxy.as_ref()
    }

    #[must_use]
    pub fn strict_tls(&self) -> bool {
        self.strict_tls
    }

    #[must_use]
    pub fn client_kind(&self) -> ClientKind {
        self.client_kind
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn dom_timeout(&self) -> Duration {
        Duration::from_millis(self.dom_timeout_ms)
    }

    #[must_use]
    pub fn dom_poll_interval(&self) -> Duration {
        Duration::from_millis(self.dom_poll_ms)
    }

    #[must_use]
    pub fn excluded_patterns(&self) -> Option<&Vec<String>> {
        self.excluded_patterns.as_ref()
    }

    #[must_use]
    pub fn should_visit(&self) -> Option<&AdmissionPredicate> {
        self.should_visit.as_ref()
    }

    #[must_use]
    pub fn link_extractor(&self) -> Arc<dyn LinkExtractor> {
        Arc::clone(&self.extractor)
    }
}

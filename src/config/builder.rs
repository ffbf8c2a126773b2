//! Fluent builder for `CrawlConfig`
//!
//! Every setting has a default, so `CrawlConfig::builder().build()` yields the
//! stock crawl policy. `build()` validates the combination and pre-compiles
//! exclusion globs.

use anyhow::{Result, anyhow, bail};
use regex::Regex;
use reqwest::header::{HeaderName, HeaderValue};
use std::sync::Arc;

use super::types::{AdmissionPredicate, ClientKind, CrawlConfig, Headers, ProxySettings};
use crate::client::LinkExtractor;
use crate::crawl_events::CrawlEventBus;

/// Compile a glob pattern into a regex
///
/// Converts glob patterns (where * matches any sequence) into proper regex patterns.
/// Everything other than `*` is matched literally.
///
/// # Errors
///
/// Returns an error if the resulting regex pattern is invalid.
pub(crate) fn compile_glob_pattern(pattern: &str) -> Result<Regex> {
    let regex_pattern = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    // Anchor pattern to match full string
    let anchored = format!("^{regex_pattern}$");

    Regex::new(&anchored).map_err(|e| anyhow!("Invalid glob pattern '{pattern}': {e}"))
}

fn validate_headers(headers: &Headers) -> Result<()> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| anyhow!("Invalid header name '{name}': {e}"))?;
        HeaderValue::from_str(value)
            .map_err(|e| anyhow!("Invalid value for header '{name}': {e}"))?;
    }
    Ok(())
}

pub struct CrawlConfigBuilder {
    pub(crate) config: CrawlConfig,
}

impl Default for CrawlConfigBuilder {
    fn default() -> Self {
        Self {
            config: CrawlConfig::default(),
        }
    }
}

impl CrawlConfig {
    /// Create a builder for configuring a `CrawlConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> CrawlConfigBuilder {
        CrawlConfigBuilder::default()
    }
}

impl CrawlConfigBuilder {
    /// Number of concurrent legs (default: 10)
    #[must_use]
    pub fn legs(mut self, legs: usize) -> Self {
        self.config.legs = legs;
        self
    }

    /// Fetches a leg performs before it is recycled (default: 10)
    #[must_use]
    pub fn max_uses(mut self, max_uses: u32) -> Self {
        self.config.max_uses = max_uses;
        self
    }

    #[must_use]
    pub fn trim_hashes(mut self, enabled: bool) -> Self {
        self.config.trim_hashes = enabled;
        self
    }

    #[must_use]
    pub fn skip_dupes(mut self, enabled: bool) -> Self {
        self.config.skip_dupes = enabled;
        self
    }

    /// Only admit discovered URIs that start with one of the seed directories
    #[must_use]
    pub fn stay_in_range(mut self, enabled: bool) -> Self {
        self.config.stay_in_range = enabled;
        self
    }

    #[must_use]
    pub fn resolve_relative(mut self, enabled: bool) -> Self {
        self.config.resolve_relative = enabled;
        self
    }

    #[must_use]
    pub fn http_only(mut self, enabled: bool) -> Self {
        self.config.http_only = enabled;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Add a default request header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Replace all default request headers
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.config.headers = headers;
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: ProxySettings) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// Reject invalid TLS certificates (default: true)
    #[must_use]
    pub fn strict_tls(mut self, strict: bool) -> Self {
        self.config.strict_tls = strict;
        self
    }

    #[must_use]
    pub fn client_kind(mut self, kind: ClientKind) -> Self {
        self.config.client_kind = kind;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    /// How long a rendered page may take to become ready (browser legs only)
    #[must_use]
    pub fn dom_timeout_ms(mut self, ms: u64) -> Self {
        self.config.dom_timeout_ms = ms;
        self
    }

    #[must_use]
    pub fn dom_poll_ms(mut self, ms: u64) -> Self {
        self.config.dom_poll_ms = ms;
        self
    }

    /// Glob patterns (`*` wildcard) of URIs that are never admitted
    #[must_use]
    pub fn excluded_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.excluded_patterns = Some(patterns);
        self
    }

    /// Final admission check run on every candidate URI
    #[must_use]
    pub fn should_visit<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.config.should_visit = Some(AdmissionPredicate::new(predicate));
        self
    }

    #[must_use]
    pub fn link_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.config.extractor = extractor;
        self
    }

    #[must_use]
    pub fn event_bus(mut self, bus: Arc<CrawlEventBus>) -> Self {
        self.config.event_bus = Some(bus);
        self
    }

    pub fn build(self) -> Result<CrawlConfig> {
        let mut config = self.config;

        if config.legs == 0 {
            bail!("legs must be at least 1");
        }
        if config.max_uses == 0 {
            bail!("max_uses must be at least 1");
        }
        if config.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be at least 1");
        }
        if config.dom_poll_ms == 0 {
            bail!("dom_poll_ms must be at least 1");
        }

        validate_headers(&config.headers)?;
        HeaderValue::from_str(&config.user_agent)
            .map_err(|e| anyhow!("Invalid user agent: {e}"))?;

        if let Some(proxy) = &config.proxy
            && proxy.host.trim().is_empty()
        {
            bail!("proxy host must not be empty");
        }

        // Compile excluded patterns once at config creation
        config.excluded_patterns_compiled = match &config.excluded_patterns {
            Some(patterns) => patterns
                .iter()
                .map(|p| compile_glob_pattern(p))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(config)
    }
}

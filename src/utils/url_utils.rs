//! URL manipulation utilities.
//!
//! Small, allocation-light helpers shared by the frontier filter and the
//! fetch clients.

use url::Url;

/// Check if a URL is a fetchable http(s) URL
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Resolve a raw link against the page it was found on.
///
/// Returns `None` for blank input. When `base` is `None` the link must already
/// be absolute to be normalized; otherwise it is returned unchanged so later
/// stages can decide what to do with it.
#[must_use]
pub fn resolve_link(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let resolved = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    };

    match resolved {
        Ok(url) => Some(url.to_string()),
        Err(_) => Some(raw.to_string()),
    }
}

/// Strip everything from the first `#` onwards
#[must_use]
pub fn trim_fragment(uri: &str) -> &str {
    match uri.find('#') {
        Some(idx) => &uri[..idx],
        None => uri,
    }
}

/// Derive the range prefix for a seed URI: the directory the seed lives in.
///
/// `http://ex.com/a` becomes `http://ex.com/`, `http://ex.com/docs/` stays
/// as is. Unparseable seeds are used verbatim.
#[must_use]
pub fn range_prefix(seed: &str) -> String {
    Url::parse(seed)
        .and_then(|url| url.join("./"))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| seed.to_string())
}

//! JavaScript evaluated inside browser legs
//!
//! Scripts are fixed at compile time. Each returns a JSON-serializable value
//! that the host deserializes; no code is assembled from user input.

/// Readiness probe polled until the page has finished loading
pub const READY_STATE_SCRIPT: &str = r"
    (() => ({
        readyState: document.readyState,
        bodyExists: document.body !== null
    }))()
";

/// Snapshot of the rendered page, deserialized into `RenderedDocument`
pub const RENDERED_DOCUMENT_SCRIPT: &str = r"
    (() => ({
        href: String(window.location.href),
        html: document.documentElement ? document.documentElement.outerHTML : ''
    }))()
";

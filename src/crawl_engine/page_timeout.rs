//! Orchestrator-side deadline for fetches
//!
//! Clients enforce their own timeouts. This is the backstop that guarantees a
//! leased leg is released even when a client never reports back.

use futures::future::BoxFuture;
use std::time::Duration;

use crate::client::{ClientEvent, ErrorCode, EventSink};
use crate::config::{ClientKind, CrawlConfig};
use crate::utils::constants::{BROWSER_LAUNCH_GRACE_SECS, FETCH_TIMEOUT_GRACE_SECS};

/// Longest a single fetch may run before the orchestrator fails it
#[must_use]
pub fn fetch_deadline(config: &CrawlConfig) -> Duration {
    let grace = Duration::from_secs(FETCH_TIMEOUT_GRACE_SECS);
    match config.client_kind() {
        ClientKind::Static => config.fetch_timeout() + grace,
        ClientKind::Browser => {
            config.fetch_timeout()
                + config.dom_timeout()
                + grace
                + Duration::from_secs(BROWSER_LAUNCH_GRACE_SECS)
        }
    }
}

/// Run a fetch future, reporting a `Timeout` error through `sink` if it
/// overruns `limit`
///
/// The fetch future is dropped on timeout, so whatever it was awaiting is
/// cancelled.
pub async fn with_fetch_timeout(fetch: BoxFuture<'static, ()>, limit: Duration, sink: EventSink) {
    if tokio::time::timeout(limit, fetch).await.is_err() {
        log::warn!(
            target: "tarantula::orchestrator",
            "Fetch did not report back within {}s",
            limit.as_secs()
        );
        sink.emit(ClientEvent::error(
            ErrorCode::Timeout,
            format!("Fetch timeout after {} seconds", limit.as_secs()),
        ));
    }
}

//! Fetch clients
//!
//! A fetch client is what a pool leg *is*: it takes a URI, loads it and
//! reports back through its [`EventSink`]. Two variants ship with the crate,
//! a plain HTTP client and a chromium-rendering client, unified by [`Leg`].

pub mod browser_client;
pub mod events;
pub mod js_scripts;
pub mod page;
pub mod static_client;

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

use crate::config::{ClientKind, CrawlConfig, Headers, ProxySettings};
use crate::resource_pool::LegFactory;

pub use browser_client::{BrowserClient, BrowserTiming};
pub(crate) use events::SinkMessage;
pub use events::{ClientEvent, ErrorCode, EventSink};
pub use page::{
    AnchorExtractor, ExtractError, LinkExtractor, PageHandle, RenderedDocument, extract_links,
};
pub use static_client::StaticClient;

/// Contract between the orchestrator and a leg
///
/// `fetch` must emit `ClientEvent::Request` before it returns, and the
/// returned future must end with exactly one terminal event (`Data`, `Error`
/// or `ContractViolation`) on the sink that was current when `fetch` was
/// called.
pub trait FetchClient: Send + 'static {
    /// Apply default headers and proxy. Calling it again with the same
    /// values is a no-op.
    fn configure(&mut self, headers: &Headers, proxy: Option<&ProxySettings>) -> &mut Self
    where
        Self: Sized;

    /// Replace the sink events are reported through
    fn set_event_sink(&mut self, sink: EventSink) -> &mut Self
    where
        Self: Sized;

    fn fetch(&self, uri: &str, extractor: Arc<dyn LinkExtractor>) -> BoxFuture<'static, ()>;

    /// Release connections and processes. Idempotent.
    fn destroy(&mut self) -> BoxFuture<'_, ()>;
}

/// A pool leg: one of the shipped fetch clients
pub enum Leg {
    Static(StaticClient),
    Browser(BrowserClient),
}

impl FetchClient for Leg {
    fn configure(&mut self, headers: &Headers, proxy: Option<&ProxySettings>) -> &mut Self {
        match self {
            Self::Static(client) => {
                client.configure(headers, proxy);
            }
            Self::Browser(client) => {
                client.configure(headers, proxy);
            }
        }
        self
    }

    fn set_event_sink(&mut self, sink: EventSink) -> &mut Self {
        match self {
            Self::Static(client) => {
                client.set_event_sink(sink);
            }
            Self::Browser(client) => {
                client.set_event_sink(sink);
            }
        }
        self
    }

    fn fetch(&self, uri: &str, extractor: Arc<dyn LinkExtractor>) -> BoxFuture<'static, ()> {
        match self {
            Self::Static(client) => client.fetch(uri, extractor),
            Self::Browser(client) => client.fetch(uri, extractor),
        }
    }

    fn destroy(&mut self) -> BoxFuture<'_, ()> {
        match self {
            Self::Static(client) => client.destroy(),
            Self::Browser(client) => client.destroy(),
        }
    }
}

/// Builds [`Leg`]s of the configured [`ClientKind`]
#[derive(Debug, Clone)]
pub struct DefaultLegFactory {
    config: Arc<CrawlConfig>,
}

impl DefaultLegFactory {
    #[must_use]
    pub fn new(config: Arc<CrawlConfig>) -> Self {
        Self { config }
    }
}

impl LegFactory for DefaultLegFactory {
    type Leg = Leg;

    fn create(&mut self, slot: usize) -> BoxFuture<'_, Result<Leg>> {
        async move {
            let leg = match self.config.client_kind() {
                ClientKind::Static => Leg::Static(
                    StaticClient::from_config(&self.config)
                        .with_context(|| format!("Failed to build HTTP client for slot {slot}"))?,
                ),
                // Chromium itself starts on the first fetch
                ClientKind::Browser => Leg::Browser(BrowserClient::from_config(&self.config)),
            };
            Ok(leg)
        }
        .boxed()
    }

    fn destroy(&mut self, mut leg: Leg) -> BoxFuture<'_, Result<()>> {
        async move {
            leg.destroy().await;
            Ok(())
        }
        .boxed()
    }
}

//! Test utilities shared by the tarantula integration tests

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use mockito::{Mock, Server, ServerGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tarantula::client::extract_links;
use tarantula::{
    ClientEvent, CrawlConfig, ErrorCode, EventKind, EventSink, FetchClient, Headers, LegFactory,
    LinkExtractor, ProxySettings, Tarantula, TarantulaEvent,
};

/// What the scripted site serves for a URI
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum MockPage {
    /// 200 `text/html` with this body
    Html(String),
    /// Any other status, reported as an error
    Status(u16),
    /// The extractor contract is broken on this page
    Violation,
}

/// Counters the mock legs update as they run
#[derive(Debug, Default)]
pub struct LegStats {
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub fetches: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

#[allow(dead_code)]
impl LegStats {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Leg factory serving pages from an in-memory map
#[derive(Clone)]
pub struct MockFactory {
    site: Arc<HashMap<String, MockPage>>,
    pub stats: Arc<LegStats>,
    delay: Duration,
}

#[allow(dead_code)]
impl MockFactory {
    pub fn new<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = (S, MockPage)>,
        S: Into<String>,
    {
        Self {
            site: Arc::new(pages.into_iter().map(|(uri, page)| (uri.into(), page)).collect()),
            stats: Arc::new(LegStats::default()),
            delay: Duration::from_millis(2),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl LegFactory for MockFactory {
    type Leg = MockLeg;

    fn create(&mut self, _slot: usize) -> BoxFuture<'_, Result<MockLeg>> {
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        let leg = MockLeg {
            site: Arc::clone(&self.site),
            stats: Arc::clone(&self.stats),
            delay: self.delay,
            sink: EventSink::detached(),
        };
        futures::future::ready(Ok(leg)).boxed()
    }

    fn destroy(&mut self, _leg: MockLeg) -> BoxFuture<'_, Result<()>> {
        self.stats.destroyed.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(Ok(())).boxed()
    }
}

pub struct MockLeg {
    site: Arc<HashMap<String, MockPage>>,
    stats: Arc<LegStats>,
    delay: Duration,
    sink: EventSink,
}

impl FetchClient for MockLeg {
    fn configure(&mut self, _headers: &Headers, _proxy: Option<&ProxySettings>) -> &mut Self {
        self
    }

    fn set_event_sink(&mut self, sink: EventSink) -> &mut Self {
        self.sink = sink;
        self
    }

    fn fetch(&self, uri: &str, extractor: Arc<dyn LinkExtractor>) -> BoxFuture<'static, ()> {
        let sink = self.sink.clone();
        let stats = Arc::clone(&self.stats);
        let page = self.site.get(uri).cloned();
        let delay = self.delay;
        let uri = uri.to_string();

        sink.emit(ClientEvent::Request { uri: uri.clone() });
        stats.fetches.fetch_add(1, Ordering::SeqCst);
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak.fetch_max(now, Ordering::SeqCst);

        async move {
            tokio::time::sleep(delay).await;
            let event = match page {
                Some(MockPage::Html(html)) => {
                    sink.emit(ClientEvent::Response {
                        status: 200,
                        content_type: Some("text/html".to_string()),
                    });
                    extract_links(&html, &uri, extractor.as_ref())
                }
                Some(MockPage::Status(status)) => {
                    sink.emit(ClientEvent::Response {
                        status,
                        content_type: None,
                    });
                    ClientEvent::error(ErrorCode::Status(status), "Http Status")
                }
                Some(MockPage::Violation) => ClientEvent::ContractViolation {
                    message: "links is not a list".to_string(),
                },
                None => ClientEvent::error(ErrorCode::Network, "connection refused"),
            };
            stats.in_flight.fetch_sub(1, Ordering::SeqCst);
            sink.emit(event);
        }
        .boxed()
    }

    fn destroy(&mut self) -> BoxFuture<'_, ()> {
        futures::future::ready(()).boxed()
    }
}

/// HTML page whose body is one anchor per href
#[allow(dead_code)]
pub fn page_with_links(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<a href="{href}">{href}</a>"#))
        .collect();
    format!("<!DOCTYPE html><html><head><title>t</title></head><body>{anchors}</body></html>")
}

/// Every event a crawler emitted, in order
pub type EventLog = Arc<Mutex<Vec<TarantulaEvent>>>;

/// Record every handler-visible event kind into a shared log
#[allow(dead_code)]
pub fn record_events<F>(crawler: &mut Tarantula<F>) -> EventLog
where
    F: LegFactory,
    F::Leg: FetchClient,
{
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        EventKind::Request,
        EventKind::Visit,
        EventKind::VisitData,
        EventKind::Error,
        EventKind::UrisDiscovered,
        EventKind::Done,
    ] {
        let log = Arc::clone(&log);
        crawler.on(kind, move |event| {
            log.lock().unwrap().push(event.clone());
        });
    }
    log
}

/// Events of one kind from a recorded log
#[allow(dead_code)]
pub fn events_of(log: &EventLog, kind: EventKind) -> Vec<TarantulaEvent> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|event| event.kind() == kind)
        .cloned()
        .collect()
}

/// Config with a small pool, suitable for mock sites
#[allow(dead_code)]
pub fn test_config(legs: usize) -> CrawlConfig {
    CrawlConfig::builder()
        .legs(legs)
        .build()
        .expect("Failed to create test config")
}

/// Sets up a mock HTTP server
#[allow(dead_code)]
pub async fn setup_mock_server() -> ServerGuard {
    Server::new_async().await
}

/// Creates a mock endpoint that returns HTML content
#[allow(dead_code)]
pub async fn create_html_mock(server: &mut ServerGuard, path: &str, html: &str) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(html)
        .create_async()
        .await
}

/// Creates a mock endpoint that returns a redirect
#[allow(dead_code)]
pub async fn create_redirect_mock(server: &mut ServerGuard, from: &str, to: &str) -> Mock {
    server
        .mock("GET", from)
        .with_status(301)
        .with_header("location", to)
        .create_async()
        .await
}

/// Creates a mock endpoint that returns an error
#[allow(dead_code)]
pub async fn create_error_mock(server: &mut ServerGuard, path: &str, status: usize) -> Mock {
    server
        .mock("GET", path)
        .with_status(status)
        .with_body("Error")
        .create_async()
        .await
}

/// Helper to create test URLs
#[allow(dead_code)]
pub fn test_url(server: &ServerGuard, path: &str) -> String {
    format!("{}{}", server.url(), path)
}

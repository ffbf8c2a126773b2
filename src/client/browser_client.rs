//! Browser-rendering fetch client
//!
//! Each leg owns one chromium process, launched on the first fetch and kept
//! for the leg's lifetime. Pages are opened fresh per fetch, given the run's
//! extra headers, navigated, polled until the DOM is ready and then
//! serialized by [`RENDERED_DOCUMENT_SCRIPT`] for link extraction.

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::{
    Headers as CdpHeaders, SetExtraHttpHeadersParams,
};
use chromiumoxide::Page;
use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::{ClientEvent, ErrorCode, EventSink};
use super::js_scripts::{READY_STATE_SCRIPT, RENDERED_DOCUMENT_SCRIPT};
use super::page::{LinkExtractor, RenderedDocument, extract_links};
use super::FetchClient;
use crate::browser_profile::{BrowserProfile, remove_profile_dir};
use crate::browser_setup::{LaunchOptions, launch_browser};
use crate::config::{CrawlConfig, Headers, ProxySettings};
use crate::utils::constants::BROWSER_PROFILE_PREFIX;

/// Per-page time limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserTiming {
    /// Limit for the initial navigation
    pub navigation: Duration,
    /// Limit for the DOM to report `complete` after navigation
    pub dom_timeout: Duration,
    pub dom_poll: Duration,
}

impl BrowserTiming {
    #[must_use]
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            navigation: config.fetch_timeout(),
            dom_timeout: config.dom_timeout(),
            dom_poll: config.dom_poll_interval(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadyState {
    ready_state: String,
    body_exists: bool,
}

/// A running chromium process and everything needed to tear it down
struct BrowserProcess {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
    options: LaunchOptions,
}

impl BrowserProcess {
    async fn launch(options: &LaunchOptions) -> Result<Self> {
        let profile = BrowserProfile::create(BROWSER_PROFILE_PREFIX)?;
        // On failure the profile drops here and removes itself
        let (browser, handler, _) = launch_browser(options, Some(profile.path().to_path_buf()))
            .await
            .context("Failed to launch browser")?;

        info!(
            proxy = ?options.proxy.as_ref().map(ProxySettings::server),
            "Browser leg started"
        );
        Ok(Self {
            browser,
            handler,
            user_data_dir: Some(profile.into_path()),
            options: options.clone(),
        })
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
        self.handler.abort();
        if let Some(dir) = self.user_data_dir.take() {
            remove_profile_dir(&dir);
        }
        debug!("Browser leg stopped");
    }
}

impl Drop for BrowserProcess {
    fn drop(&mut self) {
        self.handler.abort();
        if let Some(dir) = self.user_data_dir.take() {
            remove_profile_dir(&dir);
        }
    }
}

/// Start the process if missing, or restart it when its options are stale
async fn ensure_process<'a>(
    slot: &'a mut Option<BrowserProcess>,
    options: &LaunchOptions,
) -> Result<&'a BrowserProcess> {
    let process = match slot.take() {
        Some(process) if process.options == *options => process,
        Some(stale) => {
            info!("Browser options changed, restarting");
            stale.shutdown().await;
            BrowserProcess::launch(options).await?
        }
        None => BrowserProcess::launch(options).await?,
    };
    Ok(slot.insert(process))
}

pub struct BrowserClient {
    launch: LaunchOptions,
    timing: BrowserTiming,
    headers: Headers,
    process: Arc<Mutex<Option<BrowserProcess>>>,
    sink: EventSink,
}

impl BrowserClient {
    /// Client that launches chromium lazily with `launch`
    #[must_use]
    pub fn new(launch: LaunchOptions, timing: BrowserTiming) -> Self {
        Self {
            launch,
            timing,
            headers: Headers::new(),
            process: Arc::new(Mutex::new(None)),
            sink: EventSink::detached(),
        }
    }

    #[must_use]
    pub fn from_config(config: &CrawlConfig) -> Self {
        let mut client = Self::new(
            LaunchOptions::from_config(config),
            BrowserTiming::from_config(config),
        );
        client.headers = config.request_headers();
        client
    }

    #[must_use]
    pub fn launch_options(&self) -> &LaunchOptions {
        &self.launch
    }

    /// Launch the browser process now instead of on the first fetch
    pub async fn start(&self) -> Result<()> {
        let mut slot = self.process.lock().await;
        ensure_process(&mut slot, &self.launch).await.map(|_| ())
    }

    /// Stop the current process (if any) and launch a fresh one
    pub async fn restart(&self) -> Result<()> {
        let mut slot = self.process.lock().await;
        if let Some(process) = slot.take() {
            process.shutdown().await;
        }
        ensure_process(&mut slot, &self.launch).await.map(|_| ())
    }

    pub async fn is_running(&self) -> bool {
        self.process.lock().await.is_some()
    }
}

impl FetchClient for BrowserClient {
    fn configure(&mut self, headers: &Headers, proxy: Option<&ProxySettings>) -> &mut Self {
        if self.headers != *headers {
            self.headers = headers.clone();
        }
        if self.launch.proxy.as_ref() != proxy {
            // Picked up by the next fetch, which restarts the process
            self.launch.proxy = proxy.cloned();
        }
        self
    }

    fn set_event_sink(&mut self, sink: EventSink) -> &mut Self {
        self.sink = sink;
        self
    }

    fn fetch(&self, uri: &str, extractor: Arc<dyn LinkExtractor>) -> BoxFuture<'static, ()> {
        let sink = self.sink.clone();
        let process = Arc::clone(&self.process);
        let launch = self.launch.clone();
        let headers = self.headers.clone();
        let timing = self.timing;
        let uri = uri.to_string();

        sink.emit(ClientEvent::Request { uri: uri.clone() });

        async move {
            let mut slot = process.lock().await;
            let event = match ensure_process(&mut slot, &launch).await {
                Ok(process) => {
                    render_page(&process.browser, &uri, &headers, timing, extractor.as_ref())
                        .await
                }
                Err(e) => ClientEvent::error(ErrorCode::Browser, format!("{e:#}")),
            };
            drop(slot);
            sink.emit(event);
        }
        .boxed()
    }

    fn destroy(&mut self) -> BoxFuture<'_, ()> {
        async move {
            if let Some(process) = self.process.lock().await.take() {
                process.shutdown().await;
            }
            self.sink = EventSink::detached();
        }
        .boxed()
    }
}

async fn render_page(
    browser: &Browser,
    uri: &str,
    headers: &Headers,
    timing: BrowserTiming,
    extractor: &dyn LinkExtractor,
) -> ClientEvent {
    let page = match browser.new_page("about:blank").await {
        Ok(page) => page,
        Err(e) => return ClientEvent::error(ErrorCode::Browser, format!("Failed to open page: {e}")),
    };

    // The backstop timeout may drop this future mid-visit; the guard still
    // closes the tab in that case.
    let tab = TabGuard::new(page.clone(), close_tab);
    let event = visit(&page, uri, headers, timing, extractor).await;
    tab.close().await;
    event
}

fn close_tab(page: Page) -> BoxFuture<'static, ()> {
    async move {
        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }
    }
    .boxed()
}

/// Closes a tab once: explicitly through [`TabGuard::close`], or from a
/// spawned task when dropped before that
struct TabGuard<P: Send + 'static> {
    page: Option<P>,
    closer: fn(P) -> BoxFuture<'static, ()>,
}

impl<P: Send + 'static> TabGuard<P> {
    fn new(page: P, closer: fn(P) -> BoxFuture<'static, ()>) -> Self {
        Self {
            page: Some(page),
            closer,
        }
    }

    async fn close(mut self) {
        if let Some(page) = self.page.take() {
            (self.closer)(page).await;
        }
    }
}

impl<P: Send + 'static> Drop for TabGuard<P> {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!("Fetch cancelled, closing its tab in the background");
                runtime.spawn((self.closer)(page));
            }
            Err(_) => warn!("No runtime to close an abandoned tab; it lives until the browser exits"),
        }
    }
}

async fn visit(
    page: &Page,
    uri: &str,
    headers: &Headers,
    timing: BrowserTiming,
    extractor: &dyn LinkExtractor,
) -> ClientEvent {
    if !headers.is_empty() {
        let headers = match serde_json::to_value(headers) {
            Ok(value) => CdpHeaders::new(value),
            Err(e) => return ClientEvent::error(ErrorCode::Browser, e.to_string()),
        };
        if let Err(e) = page.execute(SetExtraHttpHeadersParams::new(headers)).await {
            return ClientEvent::error(ErrorCode::Browser, format!("Failed to set headers: {e}"));
        }
    }

    match tokio::time::timeout(timing.navigation, page.goto(uri)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            debug!("Navigation failed for {}: {}", uri, e);
            return ClientEvent::error(ErrorCode::Browser, "Failed to open");
        }
        Err(_) => {
            return ClientEvent::error(
                ErrorCode::Timeout,
                format!("Navigation timeout after {}ms", timing.navigation.as_millis()),
            );
        }
    }

    if !wait_for_ready(page, timing).await {
        return ClientEvent::error(ErrorCode::DomTimeout, "DOM timeout");
    }

    let rendered = match page.evaluate(RENDERED_DOCUMENT_SCRIPT).await {
        Ok(result) => result,
        Err(e) => {
            return ClientEvent::error(ErrorCode::Browser, format!("Failed to render document: {e}"));
        }
    };
    let document: RenderedDocument = match rendered.into_value() {
        Ok(document) => document,
        Err(e) => {
            return ClientEvent::ContractViolation {
                message: format!("Rendered document has unexpected shape: {e}"),
            };
        }
    };

    extract_links(&document.html, &document.href, extractor)
}

/// Poll `document.readyState` until `complete`; false when the limit passes
async fn wait_for_ready(page: &Page, timing: BrowserTiming) -> bool {
    let start = Instant::now();
    loop {
        match page.evaluate(READY_STATE_SCRIPT).await {
            Ok(result) => match result.into_value::<ReadyState>() {
                Ok(state) if state.ready_state == "complete" && state.body_exists => {
                    debug!("Page ready after {:.2}s", start.elapsed().as_secs_f64());
                    return true;
                }
                Ok(_) => {}
                Err(e) => debug!("Unreadable readyState: {}", e),
            },
            Err(e) => debug!("Failed to check readyState: {}, retrying", e),
        }

        if start.elapsed() >= timing.dom_timeout {
            return false;
        }
        tokio::time::sleep(timing.dom_poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn count_close(closes: Arc<AtomicUsize>) -> BoxFuture<'static, ()> {
        async move {
            closes.fetch_add(1, Ordering::SeqCst);
        }
        .boxed()
    }

    #[tokio::test]
    async fn explicit_close_runs_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        TabGuard::new(Arc::clone(&closes), count_close).close().await;
        tokio::task::yield_now().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_fetch_still_closes_its_tab() {
        let closes = Arc::new(AtomicUsize::new(0));
        let tab = TabGuard::new(Arc::clone(&closes), count_close);
        let stuck = async move {
            let _tab = tab;
            futures::future::pending::<()>().await;
        };

        assert!(tokio::time::timeout(Duration::from_millis(20), stuck).await.is_err());
        tokio::time::timeout(Duration::from_secs(1), async {
            while closes.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("dropped guard closes the tab");
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timing_follows_config() {
        let config = CrawlConfig::builder()
            .fetch_timeout_secs(12)
            .dom_timeout_ms(800)
            .dom_poll_ms(40)
            .build()
            .unwrap();
        let timing = BrowserTiming::from_config(&config);
        assert_eq!(timing.navigation, Duration::from_secs(12));
        assert_eq!(timing.dom_timeout, Duration::from_millis(800));
        assert_eq!(timing.dom_poll, Duration::from_millis(40));
    }

    #[tokio::test]
    async fn configure_updates_proxy_without_launching() {
        let config = CrawlConfig::default();
        let mut client = BrowserClient::from_config(&config);
        let proxy = ProxySettings::new("proxy.local").with_port(8080);

        client.configure(&Headers::new(), Some(&proxy));

        assert_eq!(client.launch_options().proxy.as_ref(), Some(&proxy));
        assert!(!client.is_running().await);
    }

    #[tokio::test]
    async fn destroy_before_start_is_noop() {
        let mut client = BrowserClient::from_config(&CrawlConfig::default());
        client.destroy().await;
        client.destroy().await;
        assert!(!client.is_running().await);
    }
}

//! Plain HTTP fetch client
//!
//! GETs the page with `reqwest`, checks status and content type, and runs the
//! link extractor over the parsed body. No scripts are executed.

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use super::events::{ClientEvent, ErrorCode, EventSink};
use super::page::{LinkExtractor, extract_links};
use super::FetchClient;
use crate::config::{CrawlConfig, Headers, ProxySettings};

const MAX_REDIRECTS: usize = 10;

pub struct StaticClient {
    headers: Headers,
    proxy: Option<ProxySettings>,
    strict_tls: bool,
    timeout: Duration,
    client: Option<Client>,
    sink: EventSink,
}

impl StaticClient {
    /// Client with no default headers and no proxy
    pub fn new(strict_tls: bool, timeout: Duration) -> Result<Self> {
        let mut client = Self {
            headers: Headers::new(),
            proxy: None,
            strict_tls,
            timeout,
            client: None,
            sink: EventSink::detached(),
        };
        client.client = Some(client.build_client()?);
        Ok(client)
    }

    /// Client preconfigured with the run's headers and proxy
    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        let mut client = Self::new(config.strict_tls(), config.fetch_timeout())?;
        client.headers = config.request_headers();
        client.proxy = config.proxy().cloned();
        client.client = Some(client.build_client()?);
        Ok(client)
    }

    fn build_client(&self) -> Result<Client> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    default_headers.insert(name, value);
                }
                _ => log::warn!("Skipping invalid header '{name}'"),
            }
        }

        let mut builder = Client::builder()
            .default_headers(default_headers)
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .danger_accept_invalid_certs(!self.strict_tls);

        if let Some(proxy) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy.to_url())
                .with_context(|| format!("Invalid proxy '{}'", proxy.server()))?;
            builder = builder.proxy(proxy);
        }

        builder.build().context("Failed to build HTTP client")
    }
}

impl FetchClient for StaticClient {
    fn configure(&mut self, headers: &Headers, proxy: Option<&ProxySettings>) -> &mut Self {
        if self.client.is_some() && self.headers == *headers && self.proxy.as_ref() == proxy {
            return self;
        }

        self.headers = headers.clone();
        self.proxy = proxy.cloned();
        self.client = match self.build_client() {
            Ok(client) => Some(client),
            Err(e) => {
                log::warn!("Failed to reconfigure HTTP client: {e:#}");
                None
            }
        };
        self
    }

    fn set_event_sink(&mut self, sink: EventSink) -> &mut Self {
        self.sink = sink;
        self
    }

    fn fetch(&self, uri: &str, extractor: Arc<dyn LinkExtractor>) -> BoxFuture<'static, ()> {
        let sink = self.sink.clone();
        let client = self.client.clone();
        let uri = uri.to_string();

        sink.emit(ClientEvent::Request { uri: uri.clone() });

        async move {
            let event = match client {
                Some(client) => fetch_page(&client, &uri, &sink, extractor.as_ref()).await,
                None => ClientEvent::error(ErrorCode::Network, "HTTP client unavailable"),
            };
            sink.emit(event);
        }
        .boxed()
    }

    fn destroy(&mut self) -> BoxFuture<'_, ()> {
        self.client = None;
        self.sink = EventSink::detached();
        futures::future::ready(()).boxed()
    }
}

async fn fetch_page(
    client: &Client,
    uri: &str,
    sink: &EventSink,
    extractor: &dyn LinkExtractor,
) -> ClientEvent {
    let response = match client.get(uri).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    sink.emit(ClientEvent::Response {
        status: status.as_u16(),
        content_type: content_type.clone(),
    });

    if status != StatusCode::OK {
        return ClientEvent::error(ErrorCode::Status(status.as_u16()), "Http Status");
    }

    let content_type = content_type.unwrap_or_default();
    if !is_html(&content_type) {
        return ClientEvent::error(ErrorCode::NotHtml, format!("Not HTML: {content_type}"));
    }

    let page_uri = response.url().to_string();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return classify_error(&e),
    };
    let html = match std::str::from_utf8(&body) {
        Ok(html) => html,
        Err(e) => {
            return ClientEvent::error(ErrorCode::Parse, format!("Document is not valid UTF-8: {e}"));
        }
    };

    extract_links(html, &page_uri, extractor)
}

fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

fn classify_error(error: &reqwest::Error) -> ClientEvent {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    let code = if error.is_timeout() {
        ErrorCode::Timeout
    } else {
        ErrorCode::Network
    };
    ClientEvent::error(code, message)
}

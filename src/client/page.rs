//! Link extraction over a parsed document
//!
//! Both fetch clients end up with an HTML string and the URI it was served
//! from; [`extract_links`] turns that pair into the terminal client event by
//! running the configured [`LinkExtractor`].

use scraper::{ElementRef, Html, Selector};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use serde::Deserialize;
use url::Url;

use super::events::{ClientEvent, ErrorCode};

/// Failure reported by a link extractor
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Extraction failed for this page; the crawl continues
    #[error("{0}")]
    Failed(String),
    /// The extractor produced something that is not a list of links
    #[error("extraction contract violated: {0}")]
    Contract(String),
}

/// Query handle over a parsed page
#[derive(Clone, Copy)]
pub struct PageHandle<'a> {
    document: &'a Html,
}

impl<'a> PageHandle<'a> {
    #[must_use]
    pub fn new(document: &'a Html) -> Self {
        Self { document }
    }

    #[must_use]
    pub fn document(&self) -> &'a Html {
        self.document
    }

    /// All elements matching a CSS selector, in document order
    pub fn select(&self, css: &str) -> Result<Vec<ElementRef<'a>>, ExtractError> {
        let selector = Selector::parse(css)
            .map_err(|e| ExtractError::Failed(format!("Invalid selector '{css}': {e}")))?;
        Ok(self.document.select(&selector).collect())
    }

    /// Value of `attr` on every element matching `css` that carries it
    pub fn attr_values(&self, css: &str, attr: &str) -> Result<Vec<String>, ExtractError> {
        Ok(self
            .select(css)?
            .into_iter()
            .filter_map(|element| element.value().attr(attr))
            .map(str::to_string)
            .collect())
    }
}

/// Pulls candidate links out of a page
///
/// Implemented for plain functions and closures with the same signature:
///
/// ```rust,ignore
/// fn images(page: &PageHandle<'_>, _uri: &str) -> Result<Vec<String>, ExtractError> {
///     page.attr_values("img[src]", "src")
/// }
/// ```
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, page: &PageHandle<'_>, page_uri: &str) -> Result<Vec<String>, ExtractError>;
}

impl<F> LinkExtractor for F
where
    F: Fn(&PageHandle<'_>, &str) -> Result<Vec<String>, ExtractError> + Send + Sync,
{
    fn extract(&self, page: &PageHandle<'_>, page_uri: &str) -> Result<Vec<String>, ExtractError> {
        (self)(page, page_uri)
    }
}

/// Default extractor: every `a[href]`, resolved against the page URI
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorExtractor;

impl LinkExtractor for AnchorExtractor {
    fn extract(&self, page: &PageHandle<'_>, page_uri: &str) -> Result<Vec<String>, ExtractError> {
        let base = Url::parse(page_uri).ok();
        Ok(page
            .attr_values("a[href]", "href")?
            .into_iter()
            .map(|href| match &base {
                Some(base) => base.join(&href).map_or(href, |url| url.to_string()),
                None => href,
            })
            .collect())
    }
}

/// Structured result returned by the in-browser rendering script
#[derive(Debug, Clone, Deserialize)]
pub struct RenderedDocument {
    /// `location.href` after scripts and redirects ran
    pub href: String,
    /// Serialized DOM (`document.documentElement.outerHTML`)
    pub html: String,
}

/// Parse `html` and run `extractor` over it
///
/// Parsing and extraction are synchronous; the parsed document never
/// crosses an await point.
pub fn extract_links(html: &str, page_uri: &str, extractor: &dyn LinkExtractor) -> ClientEvent {
    let document = Html::parse_document(html);
    let page = PageHandle::new(&document);

    // A panicking extractor fails this page only; the leg must still report.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(&page, page_uri)));

    match outcome {
        Ok(Ok(links)) => ClientEvent::Data {
            links,
            page_uri: page_uri.to_string(),
        },
        Ok(Err(ExtractError::Failed(message))) => ClientEvent::error(ErrorCode::Extract, message),
        Ok(Err(ExtractError::Contract(message))) => ClientEvent::ContractViolation { message },
        Err(payload) => ClientEvent::error(
            ErrorCode::Extract,
            format!("Link extractor panicked: {}", panic_message(payload.as_ref())),
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

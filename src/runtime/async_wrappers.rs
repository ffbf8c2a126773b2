//! Future-based handle for crawls running on a background task.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::crawl_engine::{CrawlError, CrawlResult, CrawlSummary};

/// A pending crawl started with `Tarantula::spawn`
///
/// Wraps a oneshot receiver and implements Future so it can be awaited.
/// Resolves to `CrawlError::Cancelled` if the crawl task died without
/// reporting.
pub struct CrawlRequest {
    receiver: oneshot::Receiver<CrawlResult<CrawlSummary>>,
}

impl CrawlRequest {
    #[must_use]
    pub fn new(receiver: oneshot::Receiver<CrawlResult<CrawlSummary>>) -> Self {
        Self { receiver }
    }
}

impl Future for CrawlRequest {
    type Output = CrawlResult<CrawlSummary>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CrawlError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_sender_is_cancellation() {
        let (tx, rx) = oneshot::channel();
        drop(tx);
        assert!(matches!(CrawlRequest::new(rx).await, Err(CrawlError::Cancelled)));
    }
}

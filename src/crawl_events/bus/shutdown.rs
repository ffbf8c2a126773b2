//! Shutdown operations for the CrawlEventBus

use std::sync::atomic::Ordering;

use crate::crawl_events::types::{ShutdownReason, TarantulaEvent};

use super::core::CrawlEventBus;

impl CrawlEventBus {
    /// Publish a final `Shutdown` event and signal all waiters
    ///
    /// Idempotent: only the first call publishes. All clones of this bus
    /// share the same shutdown signal.
    pub fn shutdown(&self, reason: ShutdownReason) {
        if self.shutdown_flag.swap(true, Ordering::SeqCst) {
            return;
        }
        log::debug!("Event bus shutting down: {reason:?}");
        let _ = self.send(TarantulaEvent::shutdown(reason));
        self.shutdown.notify_waiters();
    }

    /// Wait for shutdown signal
    ///
    /// Returns immediately if the bus is already shut down. Subscribers can
    /// use this with `tokio::select!` to exit gracefully.
    pub async fn wait_for_shutdown(&self) {
        let notified = self.shutdown.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_shutdown() {
            return;
        }
        notified.await;
    }

    /// Check if shutdown has been signaled
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }
}

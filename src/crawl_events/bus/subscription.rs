//! Subscription operations for the CrawlEventBus

use tokio::sync::broadcast;

use crate::crawl_events::streaming::FilteredReceiver;
use crate::crawl_events::types::{EventKind, TarantulaEvent};

use super::core::CrawlEventBus;

impl CrawlEventBus {
    /// Subscribe to all events published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TarantulaEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let count = self.sender.receiver_count();
        if self.config.enable_metrics {
            self.metrics.update_subscriber_count(count);
        }
        count
    }

    /// Check if the event bus has any active subscribers
    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Create a filtered subscriber that only receives matching events
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&TarantulaEvent) -> bool + Send + Sync + 'static,
    {
        FilteredReceiver::new(self.subscribe(), filter)
    }

    /// Subscribe to events of the given kinds only
    pub fn subscribe_kinds(
        &self,
        kinds: &[EventKind],
    ) -> FilteredReceiver<impl Fn(&TarantulaEvent) -> bool + Send + Sync + 'static> {
        let kinds = kinds.to_vec();
        self.subscribe_filtered(move |event| kinds.contains(&event.kind()))
    }
}

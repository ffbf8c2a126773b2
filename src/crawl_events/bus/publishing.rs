//! Publishing operations for the CrawlEventBus

use std::sync::atomic::Ordering;

use crate::crawl_events::errors::EventBusError;
use crate::crawl_events::types::TarantulaEvent;

use super::core::CrawlEventBus;

impl CrawlEventBus {
    /// Publish an event to all subscribers
    ///
    /// Never blocks: when a subscriber's buffer is full its oldest events are
    /// dropped and it observes `ReceiverLagged` on the next receive.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of active subscribers that received the event
    /// * `Err(EventBusError::NoSubscribers)` - Nobody is listening
    /// * `Err(EventBusError::Shutdown)` - The bus was shut down
    pub fn publish(&self, event: TarantulaEvent) -> Result<usize, EventBusError> {
        if self.shutdown_flag.load(Ordering::SeqCst) {
            return Err(EventBusError::Shutdown);
        }
        self.send(event)
    }

    pub(super) fn send(&self, event: TarantulaEvent) -> Result<usize, EventBusError> {
        if let Ok(subscriber_count) = self.sender.send(event) {
            if self.config.enable_metrics {
                self.metrics.increment_published();
                self.metrics.update_subscriber_count(subscriber_count);
            }
            Ok(subscriber_count)
        } else {
            if self.config.enable_metrics {
                self.metrics.increment_dropped();
            }
            log::trace!("Published event but no active subscribers");
            Err(EventBusError::NoSubscribers)
        }
    }
}

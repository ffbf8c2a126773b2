//! Core CrawlEventBus struct definition and constructors

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Notify, broadcast};

use crate::crawl_events::config::EventBusConfig;
use crate::crawl_events::metrics::EventBusMetrics;
use crate::crawl_events::types::TarantulaEvent;

/// Event bus for publishing and subscribing to crawl events
///
/// Cloning is cheap; clones share the channel, metrics and shutdown signal.
#[derive(Debug, Clone)]
pub struct CrawlEventBus {
    pub(super) sender: broadcast::Sender<TarantulaEvent>,
    pub(super) config: Arc<EventBusConfig>,
    pub(super) metrics: EventBusMetrics,
    pub(super) shutdown: Arc<Notify>,
    pub(super) shutdown_flag: Arc<AtomicBool>,
}

impl CrawlEventBus {
    /// Create a new event bus with the specified capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let config = EventBusConfig {
            capacity,
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Create a new event bus with custom configuration
    #[must_use]
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.capacity.max(1));
        Self {
            sender,
            config: Arc::new(config),
            metrics: EventBusMetrics::new(),
            shutdown: Arc::new(Notify::new()),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Get current metrics
    ///
    /// Individual counter reads are atomic; use `metrics().snapshot()` for a
    /// view across all counters.
    #[must_use]
    pub fn metrics(&self) -> &EventBusMetrics {
        &self.metrics
    }

    /// Get current number of events in the channel buffer
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.sender.len()
    }
}

impl Default for CrawlEventBus {
    fn default() -> Self {
        Self::with_config(EventBusConfig::default())
    }
}

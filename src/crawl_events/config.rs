//! Configuration types for the event bus

use crate::utils::DEFAULT_EVENT_BUS_CAPACITY;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Maximum number of events buffered per subscriber before the oldest
    /// are dropped
    pub capacity: usize,
    /// Whether to enable event metrics collection
    pub enable_metrics: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_EVENT_BUS_CAPACITY,
            enable_metrics: true,
        }
    }
}

//! Event system for observing a crawl run
//!
//! Two delivery paths share one event type: synchronous handlers registered
//! through [`EventEmitter`] and the optional broadcast [`CrawlEventBus`].

// Sub-modules
pub mod bus;
pub mod config;
pub mod emitter;
pub mod errors;
pub mod metrics;
pub mod streaming;
pub mod types;

// Re-exports for public API
pub use bus::CrawlEventBus;
pub use config::EventBusConfig;
pub use emitter::EventEmitter;
pub use errors::EventBusError;
pub use metrics::{EventBusMetrics, MetricsSnapshot};
pub use streaming::FilteredReceiver;
pub use types::{EventKind, ShutdownReason, TarantulaEvent};

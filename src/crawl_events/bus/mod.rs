//! Broadcast event bus for consumers that prefer a stream over callbacks
//!
//! The orchestrator publishes every `TarantulaEvent` here when a bus is
//! attached to the config, then signals shutdown once the run ends.

// Core struct and constructors
mod core;

// Functionality implementations
mod publishing;
mod shutdown;
mod subscription;

// Re-export the main type
pub use core::CrawlEventBus;

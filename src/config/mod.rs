//! Configuration module for crawling
//!
//! This module provides the `CrawlConfig` struct and its builder for
//! configuring a crawl run with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::CrawlConfigBuilder;
pub use types::{AdmissionPredicate, ClientKind, CrawlConfig, Headers, ProxySettings};

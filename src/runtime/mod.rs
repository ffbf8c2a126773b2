//! Async plumbing shared by the crawler's public API

pub mod async_wrappers;

pub use async_wrappers::CrawlRequest;

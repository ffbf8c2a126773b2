//! Crawl Engine Module
//!
//! The frontier filter, the orchestrator driving legs through the pool, and
//! the types a run produces.

pub mod crawl_types;
pub mod frontier;
pub mod orchestrator;
pub mod page_timeout;

pub use crawl_types::{CrawlError, CrawlResult, CrawlSummary, Task};
pub use frontier::{Frontier, RangeSet};
pub use orchestrator::Tarantula;
pub use page_timeout::{fetch_deadline, with_fetch_timeout};

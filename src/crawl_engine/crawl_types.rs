//! Core types for crawl runs: the unit of work, the crate error and the
//! end-of-run summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Custom error type for crawl operations
#[derive(Debug, Clone)]
pub enum CrawlError {
    /// Configuration error
    Config(String),
    /// A leg could not be created or destroyed
    Pool(String),
    /// A client broke the extraction contract; the run was aborted
    ContractViolation { uri: String, message: String },
    /// `start` was called on a crawler that already ran
    AlreadyStarted,
    /// Operation cancelled
    Cancelled,
    /// Other errors
    Other(String),
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Pool(msg) => write!(f, "Pool error: {msg}"),
            Self::ContractViolation { uri, message } => {
                write!(f, "Contract violation while crawling {uri}: {message}")
            }
            Self::AlreadyStarted => write!(f, "Crawl was already started"),
            Self::Cancelled => write!(f, "Crawl operation was cancelled"),
            Self::Other(msg) => write!(f, "Crawl error: {msg}"),
        }
    }
}

impl std::error::Error for CrawlError {}

impl From<anyhow::Error> for CrawlError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the context chain
        Self::Other(format!("{err:#}"))
    }
}

/// Convenience alias for Result with `CrawlError`
pub type CrawlResult<T> = Result<T, CrawlError>;

/// A URI to visit and the page it was found on (`None` for seeds)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    pub uri: String,
    pub parent: Option<String>,
}

impl Task {
    pub fn new(uri: impl Into<String>, parent: Option<String>) -> Self {
        Self {
            uri: uri.into(),
            parent,
        }
    }

    #[must_use]
    pub fn is_seed(&self) -> bool {
        self.parent.is_none()
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Tasks that reached a data or error outcome
    pub visited: usize,
    /// URIs admitted to the frontier, seeds included
    pub frontier_len: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_errors_keep_context() {
        let err = anyhow::anyhow!("connection refused").context("Failed to create leg");
        let crawl_err = CrawlError::from(err);
        assert_eq!(
            crawl_err.to_string(),
            "Crawl error: Failed to create leg: connection refused"
        );
    }

    #[test]
    fn seeds_have_no_parent() {
        assert!(Task::new("http://ex.com/", None).is_seed());
        assert!(!Task::new("http://ex.com/b", Some("http://ex.com/".into())).is_seed());
    }
}

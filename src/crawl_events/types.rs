//! Event type definitions for the crawl event system
//!
//! This module contains the events a crawl run emits, in the order a
//! consumer observes them: `Request`, `Visit`, then `VisitData` or `Error`
//! for each task, `UrisDiscovered` after new links are admitted, and a single
//! `Done` at the end of the run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::client::ErrorCode;
use crate::crawl_engine::Task;

/// Reason for event bus shutdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShutdownReason {
    /// Crawl completed successfully
    CrawlCompleted,
    /// Crawl aborted with an error
    Error(String),
}

/// Event types emitted during a crawl run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TarantulaEvent {
    /// A leg started fetching the task's URI
    Request { task: Arc<Task> },
    /// The server answered; emitted before the body is processed
    Visit {
        task: Arc<Task>,
        status: u16,
        content_type: Option<String>,
    },
    /// The page was fetched and its links extracted
    VisitData {
        task: Arc<Task>,
        links: Vec<String>,
        page_uri: String,
    },
    /// The task failed; the run continues
    Error {
        task: Arc<Task>,
        code: ErrorCode,
        message: String,
    },
    /// Links found on the task's page were admitted to the frontier
    UrisDiscovered {
        task: Arc<Task>,
        new_count: usize,
        total: usize,
    },
    /// The pool drained; no further events follow
    Done {
        visited: usize,
        frontier_len: usize,
        duration: Duration,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Signals that the event bus is shutting down
    ///
    /// Only published to bus subscribers, never to registered handlers.
    Shutdown {
        reason: ShutdownReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Event names handlers can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Request,
    Visit,
    VisitData,
    Error,
    UrisDiscovered,
    Done,
    Shutdown,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Visit => "visit",
            Self::VisitData => "data",
            Self::Error => "error",
            Self::UrisDiscovered => "uris",
            Self::Done => "done",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(Self::Request),
            "visit" => Ok(Self::Visit),
            "data" | "visit_data" => Ok(Self::VisitData),
            "error" => Ok(Self::Error),
            "uris" | "uris_discovered" => Ok(Self::UrisDiscovered),
            "done" => Ok(Self::Done),
            "shutdown" => Ok(Self::Shutdown),
            other => Err(format!("unknown event kind '{other}'")),
        }
    }
}

impl TarantulaEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Request { .. } => EventKind::Request,
            Self::Visit { .. } => EventKind::Visit,
            Self::VisitData { .. } => EventKind::VisitData,
            Self::Error { .. } => EventKind::Error,
            Self::UrisDiscovered { .. } => EventKind::UrisDiscovered,
            Self::Done { .. } => EventKind::Done,
            Self::Shutdown { .. } => EventKind::Shutdown,
        }
    }

    /// The task this event is about, if any
    #[must_use]
    pub fn task(&self) -> Option<&Arc<Task>> {
        match self {
            Self::Request { task }
            | Self::Visit { task, .. }
            | Self::VisitData { task, .. }
            | Self::Error { task, .. }
            | Self::UrisDiscovered { task, .. } => Some(task),
            Self::Done { .. } | Self::Shutdown { .. } => None,
        }
    }

    /// Create a `Done` event
    #[must_use]
    pub fn done(visited: usize, frontier_len: usize, duration: Duration) -> Self {
        Self::Done {
            visited,
            frontier_len,
            duration,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create a `Shutdown` event
    #[must_use]
    pub fn shutdown(reason: ShutdownReason) -> Self {
        Self::Shutdown {
            reason,
            timestamp: chrono::Utc::now(),
        }
    }
}

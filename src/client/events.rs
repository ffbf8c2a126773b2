//! Events a fetch client reports back, and the sink it reports them through

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::crawl_engine::Task;
use crate::resource_pool::LegId;

/// Why a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Server answered with a status other than 200
    Status(u16),
    /// Connection, DNS, TLS or body transfer failure
    Network,
    /// The request did not complete in time
    Timeout,
    /// The response was not `text/html`
    NotHtml,
    /// The document could not be parsed
    Parse,
    /// The link extractor reported a failure
    Extract,
    /// The rendering process could not be started or driven
    Browser,
    /// The rendered page never became ready
    DomTimeout,
}

impl ErrorCode {
    /// HTTP status for protocol failures
    #[must_use]
    pub fn status(self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "{code}"),
            Self::Network => f.write_str("ERR_NETWORK"),
            Self::Timeout => f.write_str("ERR_TIMEOUT"),
            Self::NotHtml => f.write_str("ERR_NOT_HTML"),
            Self::Parse => f.write_str("ERR_PARSE"),
            Self::Extract => f.write_str("ERR_EXTRACT"),
            Self::Browser => f.write_str("ERR_BROWSER"),
            Self::DomTimeout => f.write_str("ERR_DOM_TIMEOUT"),
        }
    }
}

/// Progress of a single fetch, as reported by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// The fetch is about to start
    Request { uri: String },
    /// Response headers arrived
    Response {
        status: u16,
        content_type: Option<String>,
    },
    /// Links extracted from the page, and the URI the page was finally
    /// served from (after redirects)
    Data { links: Vec<String>, page_uri: String },
    /// Recoverable failure for this fetch
    Error { code: ErrorCode, message: String },
    /// The extraction contract was broken; the run cannot continue
    ContractViolation { message: String },
}

impl ClientEvent {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// `Data`, `Error` and `ContractViolation` end a fetch
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Data { .. } | Self::Error { .. } | Self::ContractViolation { .. }
        )
    }
}

/// Client event tagged with the task and lease it belongs to
#[derive(Debug)]
pub(crate) struct SinkMessage {
    pub(crate) task: Arc<Task>,
    pub(crate) lease: LegId,
    pub(crate) event: ClientEvent,
}

#[derive(Debug)]
enum SinkTarget {
    Run {
        tx: mpsc::UnboundedSender<SinkMessage>,
        task: Arc<Task>,
        lease: LegId,
    },
    Standalone(mpsc::UnboundedSender<ClientEvent>),
}

/// Where a client sends its events
///
/// The orchestrator gives each leased leg a sink scoped to the task it is
/// running. A detached sink discards everything.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    target: Option<Arc<SinkTarget>>,
}

impl EventSink {
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// A sink feeding a plain channel, for driving a client outside a crawl
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            target: Some(Arc::new(SinkTarget::Standalone(tx))),
        };
        (sink, rx)
    }

    pub(crate) fn for_task(
        tx: mpsc::UnboundedSender<SinkMessage>,
        task: Arc<Task>,
        lease: LegId,
    ) -> Self {
        Self {
            target: Some(Arc::new(SinkTarget::Run { tx, task, lease })),
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    pub fn emit(&self, event: ClientEvent) {
        let delivered = match self.target.as_deref() {
            Some(SinkTarget::Run { tx, task, lease }) => tx
                .send(SinkMessage {
                    task: Arc::clone(task),
                    lease: *lease,
                    event,
                })
                .is_ok(),
            Some(SinkTarget::Standalone(tx)) => tx.send(event).is_ok(),
            None => false,
        };
        if !delivered {
            log::trace!("Event sink closed or detached, event dropped");
        }
    }
}

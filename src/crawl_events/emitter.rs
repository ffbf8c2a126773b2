//! Callback registry for crawl events
//!
//! Handlers are invoked synchronously, in registration order, on the task
//! that drives the crawl. A slow handler slows the crawl down.

use std::collections::HashMap;

use super::types::{EventKind, TarantulaEvent};

type Handler = Box<dyn FnMut(&TarantulaEvent) + Send>;

#[derive(Default)]
pub struct EventEmitter {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl EventEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every event of `kind`
    pub fn on<H>(&mut self, kind: EventKind, handler: H)
    where
        H: FnMut(&TarantulaEvent) + Send + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Invoke every handler registered for the event's kind.
    /// Returns how many handlers ran.
    pub fn emit(&mut self, event: &TarantulaEvent) -> usize {
        match self.handlers.get_mut(&event.kind()) {
            Some(handlers) => {
                for handler in handlers.iter_mut() {
                    handler(event);
                }
                handlers.len()
            }
            None => 0,
        }
    }

    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<EventKind, usize> = self
            .handlers
            .iter()
            .map(|(kind, handlers)| (*kind, handlers.len()))
            .collect();
        f.debug_struct("EventEmitter")
            .field("handlers", &counts)
            .finish()
    }
}

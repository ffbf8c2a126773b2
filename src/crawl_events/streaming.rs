//! Filtered event receivers for selective event consumption

use std::sync::Arc;
use tokio::sync::broadcast;

use super::errors::EventBusError;
use super::types::TarantulaEvent;

/// Filtered event receiver wrapper
pub struct FilteredReceiver<F>
where
    F: Fn(&TarantulaEvent) -> bool + Send + Sync + 'static,
{
    receiver: broadcast::Receiver<TarantulaEvent>,
    filter: Arc<F>,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&TarantulaEvent) -> bool + Send + Sync + 'static,
{
    pub fn new(receiver: broadcast::Receiver<TarantulaEvent>, filter: F) -> Self {
        Self {
            receiver,
            filter: Arc::new(filter),
        }
    }

    /// Receive the next event that passes the filter
    ///
    /// Non-matching buffered events are consumed and skipped.
    pub async fn recv(&mut self) -> Result<TarantulaEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if (self.filter)(&event) => return Ok(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(EventBusError::Shutdown);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Err(EventBusError::ReceiverLagged(skipped));
                }
            }
        }
    }

    /// Try to receive the next matching event without waiting
    ///
    /// # Returns
    /// * `Ok(Some(event))` - A buffered event passed the filter
    /// * `Ok(None)` - Nothing matching is buffered right now
    pub fn try_recv(&mut self) -> Result<Option<TarantulaEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if (self.filter)(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::Shutdown);
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    return Err(EventBusError::ReceiverLagged(skipped));
                }
            }
        }
    }
}

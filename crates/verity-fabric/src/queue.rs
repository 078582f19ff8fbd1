use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{FabricError, Result};
use crate::event::ConfigEvent;

/// Create a bounded event queue holding at most `capacity` pending events
/// (minimum one).
///
/// Any number of producers may hold an [`EventSender`]; exactly one consumer
/// drains the [`EventReceiver`], so events are handled one at a time in the
/// order they were sent.
pub fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { tx }, EventReceiver { rx })
}

/// Producer half of the event queue.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::Sender<ConfigEvent>,
}

impl EventSender {
    /// Enqueue an event, waiting for space if the queue is full.
    pub async fn send(&self, event: ConfigEvent) -> Result<()> {
        trace!(name = event.name(), kind = %event.kind(), "enqueue");
        self.tx.send(event).await.map_err(|_| FabricError::Shutdown)
    }

    /// Enqueue without waiting.
    pub fn try_send(&self, event: ConfigEvent) -> Result<()> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => FabricError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => FabricError::Shutdown,
        })
    }

    /// Returns `true` once the consumer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of the event queue.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<ConfigEvent>,
}

impl EventReceiver {
    /// Wait for the next event. Returns `None` once every sender is gone and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<ConfigEvent> {
        self.rx.recv().await
    }

    /// Stop accepting new events; already queued events can still be read.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

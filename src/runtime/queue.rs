//! The machine's event queue.
//!
//! An unbounded tokio channel is the only synchronization point between the
//! dispatcher and the outside world. Any thread may post; only the
//! dispatcher receives.

use crate::core::Event;
use crate::error::MachineError;
use tokio::sync::mpsc;

/// Cloneable, thread-safe handle for posting events into a machine.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    /// Enqueue an event. Never blocks and never dispatches synchronously.
    ///
    /// Fails with [`MachineError::QueueClosed`] once the machine has been
    /// torn down; late completions can ignore the error.
    pub fn post(&self, event: Event) -> Result<(), MachineError> {
        self.tx.send(event).map_err(|_| MachineError::QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving end owned by the dispatcher.
#[derive(Debug)]
pub(crate) struct EventQueue {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Next queued event without waiting.
    pub fn try_next(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event. `None` once closed and drained.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Reject further posts and drop anything still queued.
    pub fn close(&mut self) {
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

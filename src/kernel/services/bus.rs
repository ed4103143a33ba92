use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};

use crate::models::FileId;

/// Which sink a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Runtime,
    Persistence,
}

/// User-visible notifications from the explorer store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    WorkspaceLoaded { workspace_id: String },
    BufferHydrated { file_id: FileId },
    HydrationFailed { file_id: FileId, message: String },
    CacheWriteFailed { file_id: FileId, message: String },
    SinkFailed { sink: SinkKind, message: String },
    Saved { file_id: FileId, path: String },
}

/// Undrained events the bus holds before new ones are dropped.
pub const EVENT_BUS_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventSender {
    tx: SyncSender<StoreEvent>,
}

pub struct EventReceiver {
    rx: Receiver<StoreEvent>,
}

/// Bounded bus. The embedder is expected to `drain` it regularly; while it is full new events
/// are dropped instead of blocking the store.
pub fn event_bus() -> (EventSender, EventReceiver) {
    event_bus_with_capacity(EVENT_BUS_CAPACITY)
}

pub fn event_bus_with_capacity(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    (EventSender { tx }, EventReceiver { rx })
}

impl EventSender {
    /// Sends `event` without blocking. A dropped receiver only means nobody is listening.
    pub fn send(&self, event: StoreEvent) {
        match self.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(event)) => {
                tracing::debug!(event = ?event, "event bus full, dropping event");
            }
        }
    }
}

impl EventReceiver {
    pub fn try_recv(&mut self) -> Result<StoreEvent, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn drain(&mut self) -> Vec<StoreEvent> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/services/bus.rs"]
mod tests;

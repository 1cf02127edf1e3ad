// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event bus (spec.md §4.2): a single unbounded FIFO of events owned
//! by the `Server`. Unlike the teacher's `oj-daemon::event_bus`, which is
//! WAL-backed for crash recovery, this bus is purely in-process — Lance's
//! durable state is the sync daemon's own configuration documents
//! (`lance-storage`), not the event stream, so there is nothing here to
//! replay after a restart.

use lance_core::Event;
use tokio::sync::mpsc;

/// Producer handle: cheap to clone, shared by every component that emits
/// events onto the bus.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventBus {
    pub fn publish(&self, event: Event) {
        // The only receiver is the dispatcher's run loop; if it's gone
        // the daemon is shutting down and the event has nowhere to go.
        let _ = self.tx.send(event);
    }
}

/// The dispatcher's consuming half.
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Create a fresh bus and its single receiver (spec.md §4.2: "a single
/// unbounded FIFO... owned by the Server").
pub fn channel() -> (EventBus, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventBus { tx }, EventReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_then_recv_in_order() {
        let (bus, mut rx) = channel();
        bus.publish(Event::ConfigSyncChanged { in_sync: false });
        bus.publish(Event::ConfigSyncChanged { in_sync: true });
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, Event::ConfigSyncChanged { in_sync: false }));
        assert!(matches!(second, Event::ConfigSyncChanged { in_sync: true }));
    }
}

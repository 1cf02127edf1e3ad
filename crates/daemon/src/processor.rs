// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event-processor framework (spec.md §4.2). `EventProcessor`
//! instances are "attached handlers": registered explicitly, matched by
//! `is_expected_event`, and delivered to via their own request queue so a
//! slow processor never blocks the dispatcher. `AutoHandlerFactory`
//! instances are "auto-handlers": for each event the dispatcher asks
//! whether it's an init event and, if so, spawns a fresh processor.

use std::sync::Arc;

use lance_core::Event;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::DaemonError;
use crate::event_bus::EventReceiver;

/// An attached event processor (spec.md §4.2). Delivery always goes
/// through the processor's own queue (`add_event` just enqueues), so the
/// dispatcher's loop never awaits processor work.
#[async_trait::async_trait]
pub trait EventProcessor: Send + Sync {
    fn is_expected_event(&self, event: &Event) -> bool;
    fn add_event(&self, event: Event);
    /// Whether this processor's backing worker is still running. Dead
    /// processors are pruned from the attached list on the next dispatch
    /// tick (spec.md §4.2 step 3).
    fn is_alive(&self) -> bool {
        true
    }
}

/// An auto-handler factory (spec.md §4.2): for each event, asks whether
/// it is an "init event" for this class, and if so builds a fresh
/// instance to own it going forward.
#[async_trait::async_trait]
pub trait AutoHandlerFactory: Send + Sync {
    fn is_init_event(&self, event: &Event) -> bool;
    async fn create(&self, event: &Event) -> Result<Arc<dyn EventProcessor>, DaemonError>;
}

/// Lets components outside the dispatcher's own task register new
/// attached processors (spec.md §4.2 step 6: "process the add queue").
#[derive(Clone)]
pub struct DispatcherAttachHandle {
    tx: mpsc::UnboundedSender<Arc<dyn EventProcessor>>,
}

impl DispatcherAttachHandle {
    pub fn attach(&self, processor: Arc<dyn EventProcessor>) {
        let _ = self.tx.send(processor);
    }
}

/// The single dispatcher task (spec.md §4.2).
pub struct Dispatcher {
    auto_handlers: Vec<Arc<dyn AutoHandlerFactory>>,
    attached: Vec<Arc<dyn EventProcessor>>,
    add_tx: mpsc::UnboundedSender<Arc<dyn EventProcessor>>,
    add_rx: mpsc::UnboundedReceiver<Arc<dyn EventProcessor>>,
}

impl Dispatcher {
    pub fn new(auto_handlers: Vec<Arc<dyn AutoHandlerFactory>>) -> Self {
        let (add_tx, add_rx) = mpsc::unbounded_channel();
        Self {
            auto_handlers,
            attached: Vec::new(),
            add_tx,
            add_rx,
        }
    }

    /// Handle external callers can use to attach new processors while the
    /// dispatcher is running (e.g. the server container registering a
    /// freshly-started `ProjectManager`).
    pub fn attach_handle(&self) -> DispatcherAttachHandle {
        DispatcherAttachHandle {
            tx: self.add_tx.clone(),
        }
    }

    /// Run the dispatch loop until the event bus closes (spec.md §4.2
    /// steps 1-6, reordered slightly: the add-queue is drained last so a
    /// processor attached mid-tick doesn't miss the event that triggered
    /// its own attachment).
    pub async fn run(mut self, mut events: EventReceiver) {
        while let Some(event) = events.recv().await {
            self.prune_dead();
            self.deliver_to_attached(&event);
            self.spawn_auto_handlers(&event).await;
            self.drain_add_queue();
        }
    }

    fn prune_dead(&mut self) {
        self.attached.retain(|p| p.is_alive());
    }

    fn deliver_to_attached(&self, event: &Event) {
        for processor in &self.attached {
            if processor.is_expected_event(event) {
                processor.add_event(event.clone());
            }
        }
    }

    async fn spawn_auto_handlers(&mut self, event: &Event) {
        for factory in self.auto_handlers.clone() {
            if !factory.is_init_event(event) {
                continue;
            }
            match factory.create(event).await {
                Ok(processor) => {
                    processor.add_event(event.clone());
                    self.attached.push(processor);
                }
                Err(e) => {
                    // spec.md §4.2: "an exception while creating or
                    // starting a processor is logged and the dispatcher
                    // continues."
                    warn!(error = %e, "auto-handler failed to start");
                }
            }
        }
    }

    fn drain_add_queue(&mut self) {
        while let Ok(processor) = self.add_rx.try_recv() {
            self.attached.push(processor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProcessor {
        seen: Arc<AtomicUsize>,
    }

    impl EventProcessor for CountingProcessor {
        fn is_expected_event(&self, event: &Event) -> bool {
            matches!(event, Event::ConfigSyncChanged { .. })
        }

        fn add_event(&self, _event: Event) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn attached_processor_receives_matching_events_only() {
        let (bus, rx) = event_bus::channel();
        let seen = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new(Vec::new());
        dispatcher.attached.push(Arc::new(CountingProcessor {
            seen: seen.clone(),
        }));

        bus.publish(Event::ConfigSyncChanged { in_sync: true });
        bus.publish(Event::DevicesAdded {
            devices: vec![],
            source: "test".into(),
        });
        drop(bus);
        dispatcher.run(rx).await;

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    struct AlwaysInit;

    #[async_trait::async_trait]
    impl AutoHandlerFactory for AlwaysInit {
        fn is_init_event(&self, event: &Event) -> bool {
            matches!(event, Event::FoldersAdded { .. })
        }

        async fn create(&self, _event: &Event) -> Result<Arc<dyn EventProcessor>, DaemonError> {
            Ok(Arc::new(CountingProcessor {
                seen: Arc::new(AtomicUsize::new(0)),
            }))
        }
    }

    #[tokio::test]
    async fn auto_handler_spawns_on_init_event() {
        let (bus, rx) = event_bus::channel();
        let dispatcher = Dispatcher::new(vec![Arc::new(AlwaysInit)]);
        bus.publish(Event::FoldersAdded {
            folders: vec![],
            source: "test".into(),
        });
        drop(bus);
        dispatcher.run(rx).await;
    }
}

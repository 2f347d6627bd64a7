//! Event fan-out to any number of concurrent observers.
//!
//! Each subscriber gets its own bounded channel; publishing is a non-blocking
//! `try_send` per channel, so one slow or stalled consumer only loses its own
//! events and never holds up the publisher or the other subscribers.

use crate::models::Event;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// Per-subscriber buffer depth. A subscriber that falls this far behind
/// starts losing events until it drains.
pub const SUBSCRIBER_BUFFER: usize = 64;

#[derive(Default)]
struct Registry {
    next_id: u64,
    channels: HashMap<u64, mpsc::Sender<Event>>,
}

/// Registry of live subscriber channels. Cheap to clone; clones share the
/// same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new delivery channel. The subscriber observes every event
    /// published after this call, in publish order.
    pub fn subscribe(&self) -> Subscriber {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = {
            let mut registry = self.inner.lock().expect("bus lock");
            let id = registry.next_id;
            registry.next_id += 1;
            registry.channels.insert(id, tx);
            id
        };
        debug!("Subscriber {} registered", id);
        Subscriber {
            id,
            rx,
            bus: self.clone(),
        }
    }

    /// Deliver to every registered channel independently. A full buffer drops
    /// the event for that subscriber only; a closed channel is pruned.
    pub fn publish(&self, event: &Event) {
        let channels: Vec<(u64, mpsc::Sender<Event>)> = {
            let registry = self.inner.lock().expect("bus lock");
            registry
                .channels
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        let mut closed = Vec::new();
        for (id, tx) in channels {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Backpressure policy: silent per-subscriber drop.
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut registry = self.inner.lock().expect("bus lock");
            for id in closed {
                registry.channels.remove(&id);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("bus lock").channels.len()
    }

    fn unsubscribe(&self, id: u64) {
        // Idempotent: removing an already-removed id is a no-op.
        self.inner.lock().expect("bus lock").channels.remove(&id);
        debug!("Subscriber {} deregistered", id);
    }
}

/// A private delivery channel. Dropping the subscriber deregisters it.
pub struct Subscriber {
    id: u64,
    rx: mpsc::Receiver<Event>,
    bus: EventBus,
}

impl Subscriber {
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogEntry;

    fn log_event(msg: &str) -> Event {
        Event::Log(LogEntry {
            timestamp: "2024-01-01 00:00:00 UTC".into(),
            message: msg.into(),
        })
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_published_events() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(&log_event("one"));
        bus.publish(&log_event("two"));

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await, Some(log_event("one")));
            assert_eq!(sub.recv().await, Some(log_event("two")));
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_does_not_affect_others() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(a);
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(&log_event("after"));
        assert_eq!(b.recv().await, Some(log_event("after")));
    }

    #[tokio::test]
    async fn test_full_buffer_drops_for_that_subscriber_only() {
        let bus = EventBus::new();
        let mut slow = bus.subscribe();
        let mut fast = bus.subscribe();

        // Overfill the slow subscriber without draining it.
        for i in 0..(SUBSCRIBER_BUFFER + 10) {
            bus.publish(&log_event(&format!("m{}", i)));
            // The fast subscriber drains as it goes and misses nothing.
            assert_eq!(fast.try_recv(), Some(log_event(&format!("m{}", i))));
        }

        // The slow one holds exactly its buffer, in publish order.
        let mut received = 0;
        while let Some(ev) = slow.try_recv() {
            assert_eq!(ev, log_event(&format!("m{}", received)));
            received += 1;
        }
        assert_eq!(received, SUBSCRIBER_BUFFER);
    }

    #[tokio::test]
    async fn test_subscriber_sees_only_events_after_registration() {
        let bus = EventBus::new();
        bus.publish(&log_event("early"));

        let mut late = bus.subscribe();
        bus.publish(&log_event("late"));
        assert_eq!(late.try_recv(), Some(log_event("late")));
        assert_eq!(late.try_recv(), None);
    }
}

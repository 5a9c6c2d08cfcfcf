//! In-memory event bus.

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,
}

impl core::fmt::Display for InMemoryBusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InMemoryBusError::Poisoned => f.write_str("event bus lock poisoned"),
        }
    }
}

impl std::error::Error for InMemoryBusError {}

/// In-memory pub/sub bus.
///
/// - Synchronous publish, async receive
/// - Explicit fan-out list of listeners
/// - No replay: events published before `subscribe()` are not delivered
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions (as of the last publish).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|subs| subs.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self.subscribers.lock().map_err(|_| InMemoryBusError::Poisoned)?;

        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::unbounded_channel();

        // If the lock is poisoned, we still return a subscription;
        // it just never receives anything.
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(_) => tracing::warn!("event bus lock poisoned; subscription will stay idle"),
        }

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_gets_every_event_in_order() {
        let bus = InMemoryEventBus::<u32>::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(1u32).unwrap();
        bus.publish(2u32).unwrap();

        assert_eq!(a.recv().await, Some(1));
        assert_eq!(a.recv().await, Some(2));
        assert_eq!(b.recv().await, Some(1));
        assert_eq!(b.recv().await, Some(2));
    }

    #[tokio::test]
    async fn late_subscriber_sees_no_history() {
        let bus = InMemoryEventBus::<&str>::new();
        bus.publish("early").unwrap();

        let mut late = bus.subscribe();
        assert!(late.try_recv().is_err());

        bus.publish("late").unwrap();
        assert_eq!(late.recv().await, Some("late"));
    }

    #[test]
    fn dropped_subscribers_are_pruned_on_publish() {
        let bus = InMemoryEventBus::<u8>::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(7u8).unwrap();
        assert_eq!(bus.subscriber_count(), 1);
        drop(keep);
    }
}

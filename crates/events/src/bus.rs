//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus carries **discrete events** (e.g. "a product was inserted"). It has
//! no current value: a subscriber that attaches late does not see earlier
//! events. State that late subscribers must observe belongs in a
//! [`ReplayChannel`](crate::ReplayChannel) instead.
//!
//! ## Delivery
//!
//! - Every live subscription receives every event published after it was
//!   created, in publication order.
//! - Publishing never blocks; subscription queues are unbounded.
//! - Subscriptions whose receiving side was dropped are pruned on the next publish.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;

/// A subscription to an event stream.
///
/// ## Usage Pattern
///
/// ```ignore
/// let bus: Arc<dyn EventBus<Product, Error = InMemoryBusError>> = ...;
/// let mut subscription = bus.subscribe();
///
/// while let Some(event) = subscription.recv().await {
///     process(event);
/// }
/// // `None`: the bus was dropped
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. `None` once the bus is gone and the queue is drained.
    ///
    /// Cancel-safe: usable as a `tokio::select!` branch.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive an event without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Transport-agnostic pub/sub abstraction with broadcast semantics.
///
/// `publish()` can fail (e.g. lock poisoning). Fire-and-forget callers log and
/// drop the error; they never surface it to the UI.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}

//! Hot channel with last-value memory.
//!
//! A [`ReplayChannel`] is owned by exactly one writer (a source or a derived
//! node). Readers hold a [`ReplayHandle`] and open [`ReplaySubscription`]s from
//! it. A fresh subscription yields the current value first (if any), then every
//! later value. Intermediate values may be coalesced when a reader lags: each
//! value is a full snapshot, so only the latest one matters.
//!
//! Dropping the channel completes it. Subscriptions still deliver a value they
//! have not seen yet, then report completion with `None`.

use tokio::sync::watch;
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

/// Writer side. Not `Clone`: one owner publishes.
#[derive(Debug)]
pub struct ReplayChannel<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> ReplayChannel<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Channel with no value yet. Subscribers wait for the first publish.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Channel that always has a current value, starting with `initial`.
    pub fn with_initial(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Some(initial));
        Self { tx }
    }

    /// Replace the current value and wake every subscriber.
    ///
    /// Never fails, even with no subscribers attached.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(Some(value));
    }

    /// Publish only if `value` differs from the current one. Returns whether
    /// subscribers were woken.
    pub fn publish_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&value) {
                false
            } else {
                *current = Some(value);
                true
            }
        })
    }

    pub fn latest(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    pub fn handle(&self) -> ReplayHandle<T> {
        ReplayHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscribe(&self) -> ReplaySubscription<T> {
        ReplaySubscription::new(self.tx.subscribe())
    }
}

impl<T> Default for ReplayChannel<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only handle to a channel. Cheap to clone; does not keep the channel open.
#[derive(Debug, Clone)]
pub struct ReplayHandle<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T> ReplayHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn latest(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> ReplaySubscription<T> {
        ReplaySubscription::new(self.rx.clone())
    }

    /// True once the writer has gone away.
    pub fn is_closed(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}

/// One reader's cursor into a [`ReplayChannel`].
#[derive(Debug)]
pub struct ReplaySubscription<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T> ReplaySubscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(mut rx: watch::Receiver<Option<T>>) -> Self {
        // Replay: the current value counts as unseen for a new reader.
        rx.mark_changed();
        Self { rx }
    }

    /// Next value not yet seen by this subscription; `None` once the channel
    /// is complete.
    ///
    /// Cancel-safe: usable as a `tokio::select!` branch.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            self.rx.changed().await.ok()?;
            let current = self.rx.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
        }
    }

    /// Wait until the current value satisfies `predicate` and return it.
    /// `None` if the channel completes first.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Option<T> {
        let value = self
            .rx
            .wait_for(|current| current.as_ref().is_some_and(&mut predicate))
            .await
            .ok()?;
        let current: Option<T> = (*value).clone();
        current
    }

    pub fn latest(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// Adapt into a `Stream` (replays the current value first).
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + Unpin {
        WatchStream::new(self.rx).filter_map(|value| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_subscriber_gets_current_value_immediately() {
        let channel = ReplayChannel::new();
        channel.publish(1u32);
        channel.publish(2u32);

        let mut late = channel.subscribe();
        assert_eq!(late.next().await, Some(2));

        channel.publish(3);
        assert_eq!(late.next().await, Some(3));
    }

    #[tokio::test]
    async fn subscriber_waits_for_first_value() {
        let channel = ReplayChannel::<u32>::new();
        let mut sub = channel.subscribe();
        assert_eq!(sub.latest(), None);

        let waiter = tokio::spawn(async move { sub.next().await });
        tokio::task::yield_now().await;
        channel.publish(10);

        assert_eq!(waiter.await.unwrap(), Some(10));
    }

    #[tokio::test]
    async fn completion_is_reported_after_the_last_value() {
        let channel = ReplayChannel::new();
        let mut sub = channel.subscribe();
        channel.publish("last");
        drop(channel);

        assert_eq!(sub.next().await, Some("last"));
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn handle_outlives_writer_and_still_replays() {
        let channel = ReplayChannel::with_initial(5u8);
        let handle = channel.handle();
        drop(channel);

        assert!(handle.is_closed());
        assert_eq!(handle.latest(), Some(5));
        let mut sub = handle.subscribe();
        assert_eq!(sub.next().await, Some(5));
        assert_eq!(sub.next().await, None);
    }

    #[test]
    fn publish_if_changed_skips_equal_values() {
        let channel = ReplayChannel::new();
        assert!(channel.publish_if_changed(1u8));
        assert!(!channel.publish_if_changed(1u8));
        assert!(channel.publish_if_changed(2u8));
    }

    #[tokio::test]
    async fn wait_for_matches_current_or_future_value() {
        let channel = ReplayChannel::with_initial(1u32);
        let mut sub = channel.subscribe();
        assert_eq!(sub.wait_for(|v| *v == 1).await, Some(1));

        let waiter = tokio::spawn(async move { sub.wait_for(|v| *v > 2).await });
        channel.publish(2);
        tokio::task::yield_now().await;
        channel.publish(3);
        assert_eq!(waiter.await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn stream_adapter_replays_then_follows() {
        let channel = ReplayChannel::with_initial(1u32);
        let mut stream = channel.subscribe().into_stream();
        assert_eq!(stream.next().await, Some(1));

        channel.publish(2);
        assert_eq!(stream.next().await, Some(2));

        drop(channel);
        assert_eq!(stream.next().await, None);
    }
}

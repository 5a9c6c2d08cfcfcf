//! Cached remote collection.
//!
//! A [`CollectionSource`] issues exactly one fetch when it starts and caches the
//! result in a replay channel: every consumer, early or late, shares that one
//! response. A new fetch only happens through [`CollectionSource::refresh`].
//!
//! Transport failures stop here. The error is reported on the source's
//! branch. A failed first fetch follows the source's [`Continuation`]; a
//! failed refresh keeps the cached collection and the source stays alive for
//! the next refresh. [`SourceState`] tells derived nodes whether an empty
//! collection was served or stands in for a failure.

use std::marker::PhantomData;
use std::sync::Arc;

use catalog_client::{Transport, fetch_all};
use catalog_core::Collection;
use catalog_events::{ReplayChannel, ReplayHandle, ReplaySubscription};
use serde::de::DeserializeOwned;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::errors::{Continuation, ErrorBranch, ErrorSink};

/// Outcome of the latest load attempt that changed what the source serves.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceState<T> {
    Loaded(Collection<T>),
    /// No collection was ever loaded; the served empty collection is a placeholder.
    Failed,
}

impl<T> SourceState<T> {
    pub fn loaded(&self) -> Option<&Collection<T>> {
        match self {
            Self::Loaded(items) => Some(items),
            Self::Failed => None,
        }
    }
}

/// Read side of a cached remote collection. Only the source's own task writes.
#[derive(Debug)]
pub struct CollectionSource<T> {
    name: &'static str,
    handle: ReplayHandle<Collection<T>>,
    state: ReplayHandle<SourceState<T>>,
    refresh: Arc<Notify>,
    _record: PhantomData<fn() -> T>,
}

impl<T> CollectionSource<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Start the fetch task for collection `name`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        name: &'static str,
        branch: ErrorBranch,
        transport: Arc<dyn Transport>,
        errors: Arc<ErrorSink>,
        on_error: Continuation,
    ) -> (Self, JoinHandle<()>) {
        let channel = ReplayChannel::new();
        let handle = channel.handle();
        let states = ReplayChannel::new();
        let state = states.handle();
        let refresh = Arc::new(Notify::new());

        let task = tokio::spawn(run::<T>(
            name,
            branch,
            transport,
            errors,
            on_error,
            channel,
            states,
            refresh.clone(),
        ));

        let source = Self {
            name,
            handle,
            state,
            refresh,
            _record: PhantomData,
        };
        (source, task)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn subscribe(&self) -> ReplaySubscription<Collection<T>> {
        self.handle.subscribe()
    }

    /// Load outcomes, for nodes that must tell a failure from an empty response.
    pub fn subscribe_state(&self) -> ReplaySubscription<SourceState<T>> {
        self.state.subscribe()
    }

    /// Cached value, if the fetch has completed.
    pub fn latest(&self) -> Option<Collection<T>> {
        self.handle.latest()
    }

    /// Invalidate the cache: fetch again and republish. Downstream nodes
    /// recompute from the new value.
    pub fn refresh(&self) {
        tracing::info!(source = self.name, "refresh requested");
        self.refresh.notify_one();
    }
}

async fn run<T>(
    name: &'static str,
    branch: ErrorBranch,
    transport: Arc<dyn Transport>,
    errors: Arc<ErrorSink>,
    on_error: Continuation,
    channel: ReplayChannel<Collection<T>>,
    states: ReplayChannel<SourceState<T>>,
    refresh: Arc<Notify>,
) where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let mut loaded = false;
    loop {
        match fetch_all::<T>(transport.as_ref(), name).await {
            Ok(items) => {
                tracing::info!(source = name, count = items.len(), "collection fetched");
                let items = Arc::new(items);
                loaded = true;
                states.publish(SourceState::Loaded(Arc::clone(&items)));
                channel.publish(items);
            }
            Err(err) => {
                errors.report(branch, &err);
                if loaded {
                    tracing::warn!(source = name, "refresh failed, keeping cached collection");
                } else {
                    match on_error {
                        Continuation::EmptyCollection => {
                            states.publish(SourceState::Failed);
                            channel.publish(Arc::new(Vec::new()));
                        }
                        Continuation::Complete => {
                            tracing::debug!(source = name, "source completed after failure");
                            return;
                        }
                    }
                }
            }
        }

        refresh.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_client::InMemoryTransport;
    use catalog_core::{Category, CategoryId, TransportError};

    fn categories() -> Vec<Category> {
        vec![
            Category::new(CategoryId::new(1), "Garden"),
            Category::new(CategoryId::new(3), "Toolbox"),
        ]
    }

    #[tokio::test]
    async fn one_fetch_shared_by_every_subscriber() {
        let transport = Arc::new(InMemoryTransport::new().with_collection("productCategories", &categories()));
        let errors = Arc::new(ErrorSink::new());
        let (source, _task) = CollectionSource::<Category>::spawn(
            "productCategories",
            ErrorBranch::Categories,
            transport.clone(),
            errors,
            Continuation::EmptyCollection,
        );

        let mut first = source.subscribe();
        let a = first.next().await.unwrap();

        let mut late = source.subscribe();
        let b = late.next().await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 2);
        assert_eq!(transport.calls("productCategories"), 1);
    }

    #[tokio::test]
    async fn failure_reports_and_publishes_empty_collection() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.fail("productCategories", TransportError::status(500, "Internal Server Error"));
        let errors = Arc::new(ErrorSink::new());
        let (source, _task) = CollectionSource::<Category>::spawn(
            "productCategories",
            ErrorBranch::Categories,
            transport,
            errors.clone(),
            Continuation::EmptyCollection,
        );

        let value = source.subscribe().next().await.unwrap();
        assert!(value.is_empty());
        assert_eq!(source.subscribe_state().next().await, Some(SourceState::Failed));
        assert_eq!(
            errors.latest(ErrorBranch::Categories).unwrap().message,
            "Backend returned code 500: Internal Server Error"
        );
    }

    #[tokio::test]
    async fn failure_with_complete_yields_no_value() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.fail("productCategories", TransportError::network("offline"));
        let errors = Arc::new(ErrorSink::new());
        let (source, task) = CollectionSource::<Category>::spawn(
            "productCategories",
            ErrorBranch::Categories,
            transport,
            errors.clone(),
            Continuation::Complete,
        );

        task.await.unwrap();
        assert_eq!(source.subscribe().next().await, None);
        assert!(errors.latest(ErrorBranch::Categories).is_some());
    }

    #[tokio::test]
    async fn refresh_refetches_and_republishes() {
        let transport = Arc::new(InMemoryTransport::new().with_collection("productCategories", &categories()));
        let (source, _task) = CollectionSource::<Category>::spawn(
            "productCategories",
            ErrorBranch::Categories,
            transport.clone(),
            Arc::new(ErrorSink::new()),
            Continuation::EmptyCollection,
        );
        let mut sub = source.subscribe();
        assert_eq!(sub.next().await.unwrap().len(), 2);

        transport.set_collection("productCategories", &categories()[..1]);
        source.refresh();

        assert_eq!(sub.next().await.unwrap().len(), 1);
        assert_eq!(transport.calls("productCategories"), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_cached_value() {
        let transport = Arc::new(InMemoryTransport::new().with_collection("productCategories", &categories()));
        let errors = Arc::new(ErrorSink::new());
        let (source, _task) = CollectionSource::<Category>::spawn(
            "productCategories",
            ErrorBranch::Categories,
            transport.clone(),
            errors.clone(),
            Continuation::EmptyCollection,
        );
        let mut sub = source.subscribe();
        let cached = sub.next().await.unwrap();
        assert_eq!(cached.len(), 2);

        transport.fail("productCategories", TransportError::network("offline"));
        source.refresh();
        errors.subscribe(ErrorBranch::Categories).next().await.unwrap();

        let kept = source.latest().unwrap();
        assert!(Arc::ptr_eq(&cached, &kept));
        assert_eq!(source.subscribe_state().latest(), Some(SourceState::Loaded(cached)));

        transport.clear_failure("productCategories");
        transport.set_collection("productCategories", &categories()[..1]);
        source.refresh();
        assert_eq!(sub.next().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn complete_applies_only_to_the_first_fetch() {
        let transport = Arc::new(InMemoryTransport::new().with_collection("productCategories", &categories()));
        let errors = Arc::new(ErrorSink::new());
        let (source, task) = CollectionSource::<Category>::spawn(
            "productCategories",
            ErrorBranch::Categories,
            transport.clone(),
            errors.clone(),
            Continuation::Complete,
        );
        let mut sub = source.subscribe();
        assert_eq!(sub.next().await.unwrap().len(), 2);

        transport.fail("productCategories", TransportError::status(503, "Service Unavailable"));
        source.refresh();
        errors.subscribe(ErrorBranch::Categories).next().await.unwrap();
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(!task.is_finished());
        assert_eq!(source.latest().map(|c| c.len()), Some(2));
    }
}
